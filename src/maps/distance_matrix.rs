use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::app::ports::HttpClientPort;
use crate::config::MapsConfig;
use crate::error::LookupError;
use crate::maps::parse_response;
use crate::types::{CommuteResult, DepartureTime, DistancePolicy, TravelMode};

/// One resolved journey for a single travel mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub duration_secs: f64,
    /// Some providers' elements carry a duration without a distance.
    pub distance_meters: Option<f64>,
}

/// Per-mode outcomes of one commute estimate, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommuteLookup {
    pub legs: Vec<(TravelMode, Result<Leg, LookupError>)>,
}

impl CommuteLookup {
    pub fn leg(&self, mode: TravelMode) -> Option<&Result<Leg, LookupError>> {
        self.legs.iter().find(|(m, _)| *m == mode).map(|(_, r)| r)
    }

    /// Collapse the outcomes into a result, every failed mode left absent.
    pub fn to_result(&self, policy: DistancePolicy) -> CommuteResult {
        let mut result = CommuteResult::default();
        for (mode, outcome) in &self.legs {
            let Ok(leg) = outcome else { continue };
            result.set_duration(*mode, leg.duration_secs);

            let takes_distance = match policy {
                DistancePolicy::LastSucceeded => true,
                DistancePolicy::FromMode(canonical) => canonical == *mode,
            };
            if takes_distance && leg.distance_meters.is_some() {
                result.distance = leg.distance_meters;
            }
        }
        result
    }
}

/// Estimates travel time between two places for each travel mode.
pub struct CommuteEstimator {
    http: Arc<dyn HttpClientPort>,
    url: String,
    api_key: String,
    distance_policy: DistancePolicy,
}

impl CommuteEstimator {
    pub fn new(http: Arc<dyn HttpClientPort>, maps: &MapsConfig) -> Self {
        Self {
            http,
            url: maps.distance_matrix_url.clone(),
            api_key: maps.api_key.clone(),
            distance_policy: DistancePolicy::default(),
        }
    }

    pub fn with_distance_policy(mut self, policy: DistancePolicy) -> Self {
        self.distance_policy = policy;
        self
    }

    pub fn distance_policy(&self) -> DistancePolicy {
        self.distance_policy
    }

    /// Estimate all modes, failed modes left absent.
    pub async fn estimate(
        &self,
        origin: &str,
        destination: &str,
        time: DepartureTime,
    ) -> CommuteResult {
        self.lookup(origin, destination, time)
            .await
            .to_result(self.distance_policy)
    }

    /// Issue one request per travel mode, sequentially. A failing mode is
    /// logged and does not stop the others.
    #[instrument(skip(self))]
    pub async fn lookup(
        &self,
        origin: &str,
        destination: &str,
        time: DepartureTime,
    ) -> CommuteLookup {
        let mut legs = Vec::with_capacity(TravelMode::ALL.len());
        for mode in TravelMode::ALL {
            let outcome = self.fetch_leg(origin, destination, mode, time).await;
            match &outcome {
                Ok(leg) => {
                    counter!(
                        "flat_finder_lookups_total",
                        "api" => "distance_matrix",
                        "outcome" => "ok"
                    )
                    .increment(1);
                    debug!("{} leg: {}s, {:?}m", mode, leg.duration_secs, leg.distance_meters);
                }
                Err(e) => {
                    counter!(
                        "flat_finder_lookups_total",
                        "api" => "distance_matrix",
                        "outcome" => e.kind()
                    )
                    .increment(1);
                    error!("{} lookup from '{}' to '{}' failed: {}", mode, origin, destination, e);
                }
            }
            legs.push((mode, outcome));
        }
        CommuteLookup { legs }
    }

    async fn fetch_leg(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
        time: DepartureTime,
    ) -> Result<Leg, LookupError> {
        let query = [
            ("origins", origin.to_string()),
            ("destinations", destination.to_string()),
            ("departure_time", time.timestamp().to_string()),
            ("mode", mode.as_str().to_string()),
            ("units", "metric".to_string()),
            ("key", self.api_key.clone()),
        ];
        let resp = self
            .http
            .get(&self.url, &query)
            .await
            .map_err(LookupError::Transport)?;
        let body = parse_response(resp)?;
        extract_leg(&body)
    }
}

/// Read `rows[0].elements[0]` from a distance-matrix payload.
pub(crate) fn extract_leg(body: &Value) -> Result<Leg, LookupError> {
    let rows = body
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| LookupError::Malformed("rows missing".into()))?;

    if rows.len() != 1 {
        warn!("Wrong number of rows: {}", rows.len());
    }

    let element = rows
        .first()
        .and_then(|row| row["elements"].get(0))
        .ok_or_else(|| LookupError::Malformed("rows[0].elements[0] missing".into()))?;

    if let Some(status) = element.get("status").and_then(Value::as_str) {
        if status != "OK" {
            return Err(LookupError::NoResults(status.to_string()));
        }
    }

    let duration_secs = element["duration"]["value"]
        .as_f64()
        .ok_or_else(|| LookupError::Malformed("duration.value missing".into()))?;
    let distance_meters = element["distance"]["value"].as_f64();
    if distance_meters.is_none() {
        warn!("Element has a duration but no distance");
    }

    Ok(Leg {
        duration_secs,
        distance_meters,
    })
}
