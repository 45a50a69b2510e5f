use std::path::PathBuf;
use thiserror::Error;

use crate::table::Column;

#[derive(Error, Debug)]
pub enum FlatFinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Listing source error: {message}")]
    Source { message: String },

    #[error("Column '{column}' has {actual} values but the table has {expected} rows")]
    ColumnLength {
        column: Column,
        expected: usize,
        actual: usize,
    },
}

/// Problems with the startup configuration. All of these are fatal and are
/// raised before any request goes out.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No API key found at '{}'", path.display())]
    MissingApiKey { path: PathBuf },

    #[error("API key file '{}' is empty", path.display())]
    EmptyApiKey { path: PathBuf },

    #[error("No mapping endpoints file found at '{}'", path.display())]
    MissingEndpoints { path: PathBuf },

    #[error("Invalid mapping endpoints file '{}': {reason}", path.display())]
    InvalidEndpoints { path: PathBuf, reason: String },

    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("No travel destination configured")]
    MissingDestination,

    #[error("No night-time departure origin configured")]
    MissingNightOrigin,

    #[error("Unknown travel mode '{0}'")]
    UnknownTravelMode(String),
}

/// Why a single geocoding or distance-matrix lookup produced no value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    /// The provider answered but had nothing for this query.
    #[error("no results ({0})")]
    NoResults(String),

    #[error("provider rejected request: {status}{}", .message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default())]
    Api {
        status: String,
        message: Option<String>,
    },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LookupError {
    /// True when the provider simply had no data, as opposed to a failed
    /// or unreadable lookup.
    pub fn is_no_data(&self) -> bool {
        matches!(self, LookupError::NoResults(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Transport(_) => "transport",
            LookupError::Status(_) => "status",
            LookupError::NoResults(_) => "no_results",
            LookupError::Api { .. } => "api",
            LookupError::Malformed(_) => "malformed",
        }
    }
}

pub type Result<T> = std::result::Result<T, FlatFinderError>;
