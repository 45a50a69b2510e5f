// Clients for the mapping provider's geocoding and distance-matrix APIs

pub mod distance_matrix;
pub mod geocoder;

pub use distance_matrix::{CommuteEstimator, CommuteLookup, Leg};
pub use geocoder::Geocoder;

use crate::app::ports::HttpGetResult;
use crate::error::LookupError;
use serde_json::Value;

/// Turn a raw response into JSON, rejecting transport-level failures and
/// provider error statuses. `ZERO_RESULTS` is left for the caller to see as
/// an empty result list.
pub(crate) fn parse_response(resp: HttpGetResult) -> Result<Value, LookupError> {
    if !resp.is_ok() {
        return Err(LookupError::Status(resp.status));
    }
    let body: Value =
        serde_json::from_slice(&resp.bytes).map_err(|e| LookupError::Malformed(e.to_string()))?;

    match body.get("status").and_then(Value::as_str) {
        None | Some("OK") | Some("ZERO_RESULTS") => Ok(body),
        Some(status) => Err(LookupError::Api {
            status: status.to_string(),
            message: body
                .get("error_message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
    }
}
