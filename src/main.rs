use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use flat_finder::app::ports::{HttpClientPort, ListingSource};
use flat_finder::config::Config;
use flat_finder::constants::{DEFAULT_CONFIG_PATH, RIGHTMOVE_MAX_PAGES};
use flat_finder::infra::ReqwestHttp;
use flat_finder::listings::{write_table, FileSource, RightmoveSource};
use flat_finder::{ConfigError, EnrichmentPipeline, EnrichmentStep, ListingTable, TravelOverrides};

#[derive(Parser)]
#[command(name = "flat_finder")]
#[command(about = "Find rental listings and rank them by commute")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a Rightmove search and save the listings
    Scrape {
        /// Rightmove search results URL
        #[arg(long)]
        url: String,
        /// Output file (.json or .csv)
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = RIGHTMOVE_MAX_PAGES)]
        max_pages: usize,
    },
    /// Enrich a saved listing file with commute times and coordinates
    Enrich {
        /// Input file (.json or .csv) with an address column
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        enrich: EnrichArgs,
    },
    /// Scrape and enrich in one go
    Run {
        #[arg(long)]
        url: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = RIGHTMOVE_MAX_PAGES)]
        max_pages: usize,
        #[command(flatten)]
        enrich: EnrichArgs,
    },
}

#[derive(Args)]
struct EnrichArgs {
    /// Commute destination (overrides the config file)
    #[arg(long)]
    destination: Option<String>,
    /// Start of the late-night journey home (overrides the config file)
    #[arg(long)]
    night_origin: Option<String>,
    /// Where the stored distance comes from: "last" or a travel mode
    #[arg(long)]
    distance_from: Option<String>,
    /// Steps to run, comma-separated
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [EnrichmentStep::Distances, EnrichmentStep::Coordinates]
    )]
    steps: Vec<EnrichmentStep>,
}

impl EnrichArgs {
    fn overrides(&self) -> TravelOverrides {
        TravelOverrides {
            destination: self.destination.clone(),
            night_origin: self.night_origin.clone(),
            distance_from: self.distance_from.clone(),
        }
    }

    fn pipeline(
        &self,
        config: &Config,
        http: Arc<dyn HttpClientPort>,
    ) -> Result<Option<EnrichmentPipeline>, ConfigError> {
        EnrichmentPipeline::from_config(config, &self.overrides(), &self.steps, http)
    }
}

async fn load_table(source: &dyn ListingSource) -> anyhow::Result<ListingTable> {
    info!("📥 Loading listings from {}", source.source_name());
    let table = source
        .fetch_table()
        .await
        .with_context(|| format!("fetching listings from {}", source.source_name()))?;
    Ok(table)
}

async fn enrich_table(
    table: ListingTable,
    pipeline: Option<EnrichmentPipeline>,
    steps: &[EnrichmentStep],
) -> anyhow::Result<ListingTable> {
    match pipeline {
        Some(pipeline) => {
            info!(
                "🔧 Enriching {} listings (destination: {})",
                table.len(),
                pipeline.destination()
            );
            Ok(pipeline.enrich(table, steps).await?)
        }
        None => Ok(table),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new()?);

    match cli.command {
        Commands::Scrape { url, output, max_pages } => {
            let source = RightmoveSource::new(http, url).with_max_pages(max_pages);
            let table = load_table(&source).await?;
            write_table(&table, &output)?;
        }
        Commands::Enrich { input, output, enrich } => {
            let pipeline = enrich.pipeline(&config, http)?;
            let table = load_table(&FileSource::new(input)).await?;
            let table = enrich_table(table, pipeline, &enrich.steps).await?;
            write_table(&table, &output)?;
        }
        Commands::Run { url, output, max_pages, enrich } => {
            let pipeline = enrich.pipeline(&config, http.clone())?;
            let source = RightmoveSource::new(http, url).with_max_pages(max_pages);
            let table = load_table(&source).await?;
            let table = enrich_table(table, pipeline, &enrich.steps).await?;
            write_table(&table, &output)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let guard = flat_finder::logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("❌ {:#}", e);
        drop(guard);
        std::process::exit(1);
    }
}
