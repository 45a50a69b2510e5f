use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::app::ports::HttpClientPort;
use crate::config::MapsConfig;
use crate::error::LookupError;
use crate::maps::parse_response;
use crate::types::Coordinates;

/// Resolves free-text addresses to coordinates.
pub struct Geocoder {
    http: Arc<dyn HttpClientPort>,
    url: String,
    api_key: String,
}

impl Geocoder {
    pub fn new(http: Arc<dyn HttpClientPort>, maps: &MapsConfig) -> Self {
        Self {
            http,
            url: maps.geocode_url.clone(),
            api_key: maps.api_key.clone(),
        }
    }

    /// Geocode an address, swallowing failures into absent coordinates.
    pub async fn resolve(&self, address: &str) -> Coordinates {
        match self.lookup(address).await {
            Ok(coordinates) => {
                counter!("flat_finder_lookups_total", "api" => "geocode", "outcome" => "ok")
                    .increment(1);
                coordinates
            }
            Err(e) => {
                counter!("flat_finder_lookups_total", "api" => "geocode", "outcome" => e.kind())
                    .increment(1);
                if e.is_no_data() {
                    warn!("No geocoding result for '{}'", address);
                } else {
                    warn!("Geocoding failed for '{}': {}", address, e);
                }
                Coordinates::absent()
            }
        }
    }

    /// Geocode an address, reporting why nothing came back.
    #[instrument(skip(self))]
    pub async fn lookup(&self, address: &str) -> Result<Coordinates, LookupError> {
        let query = [("address", address.to_string()), ("key", self.api_key.clone())];
        let resp = self
            .http
            .get(&self.url, &query)
            .await
            .map_err(LookupError::Transport)?;
        let body = parse_response(resp)?;
        extract_coordinates(&body)
    }
}

/// Read `results[0].geometry.location` from a geocoding payload.
pub(crate) fn extract_coordinates(body: &Value) -> Result<Coordinates, LookupError> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::Malformed("results missing".into()))?;

    if results.len() != 1 {
        warn!("Wrong number of geocoding results: {}", results.len());
    }

    let first = results
        .first()
        .ok_or_else(|| LookupError::NoResults("empty results".into()))?;
    let location = &first["geometry"]["location"];
    let lat = location["lat"]
        .as_f64()
        .ok_or_else(|| LookupError::Malformed("results[0].geometry.location.lat missing".into()))?;
    let lng = location["lng"]
        .as_f64()
        .ok_or_else(|| LookupError::Malformed("results[0].geometry.location.lng missing".into()))?;

    debug!("Geocoded to ({}, {})", lat, lng);
    Ok(Coordinates::new(lat, lng))
}
