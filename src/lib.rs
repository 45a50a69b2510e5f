pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod listings;
pub mod logging;
pub mod maps;
pub mod pipeline;
pub mod table;
pub mod types;

pub use error::{ConfigError, FlatFinderError, LookupError, Result};
pub use pipeline::{EnrichmentPipeline, EnrichmentStep, TravelOverrides};
pub use table::{Column, ListingTable};
pub use types::{CommuteResult, Coordinates, DepartureTime, DistancePolicy, Listing, TravelMode};
