//! Shared constants for configuration defaults and the listing scraper.

pub const DEFAULT_CONFIG_PATH: &str = "flat_finder.toml";
pub const DEFAULT_API_KEY_FILE: &str = "api.key";
pub const DEFAULT_ENDPOINTS_FILE: &str = "google-api-endpoints.json";

/// Overrides the API key file when set and non-empty.
pub const API_KEY_ENV: &str = "FLAT_FINDER_API_KEY";

// Keys of the endpoints JSON file
pub const GEOCODE_URL_KEY: &str = "url-google-geocode";
pub const DISTANCE_MATRIX_URL_KEY: &str = "url-google-distance-matrix";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

// Rightmove serves 24 results per page and stops paginating after 42 pages
pub const RIGHTMOVE_SOURCE: &str = "rightmove";
pub const RIGHTMOVE_RESULTS_PER_PAGE: usize = 24;
pub const RIGHTMOVE_MAX_PAGES: usize = 42;
