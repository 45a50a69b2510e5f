// Commute-enrichment pipeline over listing tables

pub mod enrichment;

pub use enrichment::{EnrichmentPipeline, EnrichmentStep, TravelOverrides};
