use std::sync::Arc;
use std::time::Instant;

use clap::ValueEnum;
use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::app::ports::HttpClientPort;
use crate::config::{Config, MapsConfig};
use crate::error::{ConfigError, Result};
use crate::maps::{CommuteEstimator, Geocoder};
use crate::table::{Column, ColumnSet, ListingTable};
use crate::types::{DepartureTime, DistancePolicy};

/// One enrichment pass over a listing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStep {
    /// Commute times and distance to the destination.
    Distances,
    /// Late-night transit time home from the night origin.
    ReturnAtNight,
    /// Latitude and longitude of each address.
    Coordinates,
}

impl EnrichmentStep {
    pub fn name(&self) -> &'static str {
        match self {
            EnrichmentStep::Distances => "distances",
            EnrichmentStep::ReturnAtNight => "return_at_night",
            EnrichmentStep::Coordinates => "coordinates",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            EnrichmentStep::Distances => &[
                Column::Transit,
                Column::Bicycling,
                Column::Walking,
                Column::Distance,
            ],
            EnrichmentStep::ReturnAtNight => &[Column::LateTransit],
            EnrichmentStep::Coordinates => &[Column::Latitude, Column::Longitude],
        }
    }
}

/// Command-line values that take precedence over `[travel]` in the config file.
#[derive(Debug, Clone, Default)]
pub struct TravelOverrides {
    pub destination: Option<String>,
    pub night_origin: Option<String>,
    /// "last" or a travel mode name.
    pub distance_from: Option<String>,
}

/// Adds commute and location columns to a listing table.
///
/// Rows are processed one at a time in table order. A failed lookup only
/// blanks that row's cells; the pipeline never stops on a lookup error.
pub struct EnrichmentPipeline {
    geocoder: Geocoder,
    estimator: CommuteEstimator,
    destination: String,
    night_origin: Option<String>,
}

impl EnrichmentPipeline {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        maps: &MapsConfig,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            geocoder: Geocoder::new(http.clone(), maps),
            estimator: CommuteEstimator::new(http, maps),
            destination: destination.into(),
            night_origin: None,
        }
    }

    /// Resolve everything the given steps need before a single request is
    /// made. No steps means no maps configuration is read and `None` comes
    /// back.
    pub fn from_config(
        config: &Config,
        overrides: &TravelOverrides,
        steps: &[EnrichmentStep],
        http: Arc<dyn HttpClientPort>,
    ) -> std::result::Result<Option<Self>, ConfigError> {
        if steps.is_empty() {
            return Ok(None);
        }

        let maps = MapsConfig::load(&config.maps)?;
        let destination = overrides
            .destination
            .clone()
            .or_else(|| config.travel.destination.clone())
            .ok_or(ConfigError::MissingDestination)?;
        let night_origin = overrides
            .night_origin
            .clone()
            .or_else(|| config.travel.night_origin.clone());
        let policy: DistancePolicy = match &overrides.distance_from {
            Some(s) => s.parse()?,
            None => config.travel.distance_policy()?,
        };

        if steps.contains(&EnrichmentStep::ReturnAtNight) && night_origin.is_none() {
            return Err(ConfigError::MissingNightOrigin);
        }

        let mut pipeline = Self::new(http, &maps, destination).with_distance_policy(policy);
        pipeline.night_origin = night_origin;
        Ok(Some(pipeline))
    }

    pub fn with_night_origin(mut self, origin: impl Into<String>) -> Self {
        self.night_origin = Some(origin.into());
        self
    }

    pub fn with_distance_policy(mut self, policy: DistancePolicy) -> Self {
        self.estimator = self.estimator.with_distance_policy(policy);
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn night_origin(&self) -> Option<&str> {
        self.night_origin.as_deref()
    }

    pub fn distance_policy(&self) -> DistancePolicy {
        self.estimator.distance_policy()
    }

    /// Commute from each listing to the destination.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub async fn add_distances(&self, table: ListingTable) -> Result<ListingTable> {
        let started = Instant::now();
        let mut set = table.column_set(EnrichmentStep::Distances.columns());

        for (row, listing) in table.listings().iter().enumerate() {
            let times = self
                .estimator
                .estimate(&listing.address, &self.destination, DepartureTime::Commute)
                .await;
            set.set(row, Column::Transit, times.transit);
            set.set(row, Column::Bicycling, times.bicycling);
            set.set(row, Column::Walking, times.walking);
            set.set(row, Column::Distance, times.distance);
            debug!("Row {}: {:?}", row, times);
        }

        finish(EnrichmentStep::Distances, table, set, started)
    }

    /// Late-night transit from the night origin back to each listing.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub async fn add_return_at_night(&self, table: ListingTable) -> Result<ListingTable> {
        let origin = self
            .night_origin
            .as_deref()
            .ok_or(ConfigError::MissingNightOrigin)?;
        let started = Instant::now();
        let mut set = table.column_set(EnrichmentStep::ReturnAtNight.columns());

        for (row, listing) in table.listings().iter().enumerate() {
            let times = self
                .estimator
                .estimate(origin, &listing.address, DepartureTime::Night)
                .await;
            set.set(row, Column::LateTransit, times.transit);
        }

        finish(EnrichmentStep::ReturnAtNight, table, set, started)
    }

    /// Geocode each listing's address.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub async fn add_coordinates(&self, table: ListingTable) -> Result<ListingTable> {
        let started = Instant::now();
        let mut set = table.column_set(EnrichmentStep::Coordinates.columns());

        for (row, listing) in table.listings().iter().enumerate() {
            let coordinates = self.geocoder.resolve(&listing.address).await;
            set.set(row, Column::Latitude, coordinates.latitude);
            set.set(row, Column::Longitude, coordinates.longitude);
        }

        finish(EnrichmentStep::Coordinates, table, set, started)
    }

    /// Run the given steps in order. A night step without a night origin is
    /// rejected before any request is made.
    pub async fn enrich(
        &self,
        table: ListingTable,
        steps: &[EnrichmentStep],
    ) -> Result<ListingTable> {
        if steps.contains(&EnrichmentStep::ReturnAtNight) && self.night_origin.is_none() {
            return Err(ConfigError::MissingNightOrigin.into());
        }

        let mut table = table;
        for step in steps {
            table = match step {
                EnrichmentStep::Distances => self.add_distances(table).await?,
                EnrichmentStep::ReturnAtNight => self.add_return_at_night(table).await?,
                EnrichmentStep::Coordinates => self.add_coordinates(table).await?,
            };
        }
        Ok(table)
    }
}

fn finish(
    step: EnrichmentStep,
    table: ListingTable,
    set: ColumnSet,
    started: Instant,
) -> Result<ListingTable> {
    let absent = set.absent_count();
    let secs = started.elapsed().as_secs_f64();
    histogram!("flat_finder_step_duration_seconds", "step" => step.name()).record(secs);
    info!(
        "✅ {} step finished: {} rows, {} absent values in {:.1}s",
        step.name(),
        set.rows(),
        absent,
        secs
    );
    table.merge(set)
}
