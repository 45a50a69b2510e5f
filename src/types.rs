use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One scraped rental listing.
///
/// Only the address is required. Everything else the source knows about the
/// listing (price, URL, bedrooms, ...) is carried through untouched in
/// `attributes` so no source column is dropped on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Listing {
    /// Build a listing from an address, deriving the postcode when the
    /// address contains one.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let postcode = crate::listings::postcode::extract_postcode(&address);
        Self {
            address,
            postcode,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// Geocoded position of an address. `None` means the lookup produced nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

/// Travel times (seconds) and distance (meters) for one origin/destination pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommuteResult {
    pub distance: Option<f64>,
    pub transit: Option<f64>,
    pub bicycling: Option<f64>,
    pub walking: Option<f64>,
}

impl CommuteResult {
    pub fn duration(&self, mode: TravelMode) -> Option<f64> {
        match mode {
            TravelMode::Transit => self.transit,
            TravelMode::Bicycling => self.bicycling,
            TravelMode::Walking => self.walking,
        }
    }

    pub(crate) fn set_duration(&mut self, mode: TravelMode, seconds: f64) {
        match mode {
            TravelMode::Transit => self.transit = Some(seconds),
            TravelMode::Bicycling => self.bicycling = Some(seconds),
            TravelMode::Walking => self.walking = Some(seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Transit,
    Bicycling,
    Walking,
}

impl TravelMode {
    /// Request order used by the commute estimator.
    pub const ALL: [TravelMode; 3] = [
        TravelMode::Transit,
        TravelMode::Bicycling,
        TravelMode::Walking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Transit => "transit",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Walking => "walking",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transit" => Ok(TravelMode::Transit),
            "bicycling" | "cycling" => Ok(TravelMode::Bicycling),
            "walking" => Ok(TravelMode::Walking),
            other => Err(ConfigError::UnknownTravelMode(other.to_string())),
        }
    }
}

/// Which fixed departure instant a commute lookup uses.
///
/// Both instants are pinned calendar times rather than "now" so listings
/// scraped on different days are compared under identical timetables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartureTime {
    /// Wednesday 2020-09-02 09:00 Europe/London.
    Commute,
    /// Friday 2020-09-04 02:00 Europe/London.
    Night,
}

impl DepartureTime {
    pub const COMMUTE_TIMESTAMP: i64 = 1_599_033_600;
    pub const NIGHT_TIMESTAMP: i64 = 1_599_181_200;

    /// Unix seconds sent as `departure_time`.
    pub fn timestamp(&self) -> i64 {
        match self {
            DepartureTime::Commute => Self::COMMUTE_TIMESTAMP,
            DepartureTime::Night => Self::NIGHT_TIMESTAMP,
        }
    }
}

/// Where the stored `distance` comes from when several modes answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistancePolicy {
    /// Every successful mode overwrites the distance, so the last one wins.
    /// Matches data produced by earlier runs.
    #[default]
    LastSucceeded,
    /// Take the distance from one mode only.
    FromMode(TravelMode),
}

impl FromStr for DistancePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" | "last_succeeded" => Ok(DistancePolicy::LastSucceeded),
            other => other.parse().map(DistancePolicy::FromMode),
        }
    }
}
