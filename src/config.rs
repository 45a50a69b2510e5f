use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    API_KEY_ENV, DEFAULT_API_KEY_FILE, DEFAULT_ENDPOINTS_FILE, DISTANCE_MATRIX_URL_KEY,
    GEOCODE_URL_KEY,
};
use crate::error::ConfigError;
use crate::types::DistancePolicy;

/// Contents of `flat_finder.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub maps: MapsSettings,
    #[serde(default)]
    pub travel: TravelSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapsSettings {
    #[serde(default = "default_api_key_file")]
    pub api_key_file: PathBuf,
    #[serde(default = "default_endpoints_file")]
    pub endpoints_file: PathBuf,
}

impl Default for MapsSettings {
    fn default() -> Self {
        Self {
            api_key_file: default_api_key_file(),
            endpoints_file: default_endpoints_file(),
        }
    }
}

fn default_api_key_file() -> PathBuf {
    PathBuf::from(DEFAULT_API_KEY_FILE)
}

fn default_endpoints_file() -> PathBuf {
    PathBuf::from(DEFAULT_ENDPOINTS_FILE)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TravelSettings {
    /// Where the daily commute goes, e.g. "UCL Main Campus, London".
    pub destination: Option<String>,
    /// Where the late-night journey home starts.
    pub night_origin: Option<String>,
    /// "last" or a travel mode name.
    pub distance_from: Option<String>,
}

impl TravelSettings {
    pub fn distance_policy(&self) -> Result<DistancePolicy, ConfigError> {
        match &self.distance_from {
            Some(s) => s.parse(),
            None => Ok(DistancePolicy::default()),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

/// Credentials and endpoints for the mapping provider.
#[derive(Clone, PartialEq)]
pub struct MapsConfig {
    pub api_key: String,
    pub geocode_url: String,
    pub distance_matrix_url: String,
}

// Keeps the key out of logs
impl std::fmt::Debug for MapsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapsConfig")
            .field("api_key", &"<redacted>")
            .field("geocode_url", &self.geocode_url)
            .field("distance_matrix_url", &self.distance_matrix_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct Endpoints {
    #[serde(rename = "url-google-geocode")]
    geocode: Option<String>,
    #[serde(rename = "url-google-distance-matrix")]
    distance_matrix: Option<String>,
}

impl MapsConfig {
    pub fn new(
        api_key: impl Into<String>,
        geocode_url: impl Into<String>,
        distance_matrix_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            geocode_url: geocode_url.into(),
            distance_matrix_url: distance_matrix_url.into(),
        }
    }

    /// Resolve the API key (env override, then key file) and the endpoint
    /// URLs. Fails before anything is sent if any piece is missing.
    pub fn load(settings: &MapsSettings) -> Result<Self, ConfigError> {
        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => read_api_key(&settings.api_key_file)?,
        };
        let (geocode_url, distance_matrix_url) = read_endpoints(&settings.endpoints_file)?;
        Ok(Self {
            api_key,
            geocode_url,
            distance_matrix_url,
        })
    }
}

/// Read the key file, dropping surrounding whitespace and the trailing newline.
pub fn read_api_key(path: &Path) -> Result<String, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingApiKey {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let key = raw.trim();
    if key.is_empty() {
        return Err(ConfigError::EmptyApiKey {
            path: path.to_path_buf(),
        });
    }
    Ok(key.to_string())
}

fn read_endpoints(path: &Path) -> Result<(String, String), ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingEndpoints {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |reason: String| ConfigError::InvalidEndpoints {
        path: path.to_path_buf(),
        reason,
    };
    let endpoints: Endpoints = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
    let geocode = endpoints
        .geocode
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| invalid(format!("'{GEOCODE_URL_KEY}' missing")))?;
    let distance_matrix = endpoints
        .distance_matrix
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| invalid(format!("'{DISTANCE_MATRIX_URL_KEY}' missing")))?;
    Ok((geocode, distance_matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TravelMode;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const ENDPOINTS: &str = r#"{
        "url-google-geocode": "https://maps.googleapis.com/maps/api/geocode/json",
        "url-google-distance-matrix": "https://maps.googleapis.com/maps/api/distancematrix/json"
    }"#;

    // FLAT_FINDER_API_KEY is process-wide, so tests that load keys take turns
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn load_with_env(
        settings: &MapsSettings,
        env_key: Option<&str>,
    ) -> Result<MapsConfig, ConfigError> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        match env_key {
            Some(key) => std::env::set_var(API_KEY_ENV, key),
            None => std::env::remove_var(API_KEY_ENV),
        }
        let result = MapsConfig::load(settings);
        std::env::remove_var(API_KEY_ENV);
        result
    }

    fn settings(dir: &Path) -> MapsSettings {
        MapsSettings {
            api_key_file: dir.join("api.key"),
            endpoints_file: dir.join("endpoints.json"),
        }
    }

    #[test]
    fn test_load_reads_key_and_endpoints() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        fs::write(&settings.api_key_file, "secret-key\n").unwrap();
        fs::write(&settings.endpoints_file, ENDPOINTS).unwrap();

        let maps = load_with_env(&settings, None).unwrap();
        assert_eq!(maps.api_key, "secret-key");
        assert!(maps.geocode_url.ends_with("/geocode/json"));
        assert!(maps.distance_matrix_url.ends_with("/distancematrix/json"));
        assert!(!format!("{maps:?}").contains("secret-key"));
    }

    #[test]
    fn test_env_key_overrides_missing_key_file() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        fs::write(&settings.endpoints_file, ENDPOINTS).unwrap();

        let maps = load_with_env(&settings, Some(" envkey \n")).unwrap();
        assert_eq!(maps.api_key, "envkey");
    }

    #[test]
    fn test_env_key_wins_over_key_file() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        fs::write(&settings.api_key_file, "file-key").unwrap();
        fs::write(&settings.endpoints_file, ENDPOINTS).unwrap();

        let maps = load_with_env(&settings, Some("envkey")).unwrap();
        assert_eq!(maps.api_key, "envkey");
    }

    #[test]
    fn test_empty_env_key_falls_back_to_key_file() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        fs::write(&settings.api_key_file, "file-key\n").unwrap();
        fs::write(&settings.endpoints_file, ENDPOINTS).unwrap();

        let maps = load_with_env(&settings, Some("  ")).unwrap();
        assert_eq!(maps.api_key, "file-key");
    }

    #[test]
    fn test_missing_key_everywhere_is_fatal() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        fs::write(&settings.endpoints_file, ENDPOINTS).unwrap();

        let err = load_with_env(&settings, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
    }

    #[test]
    fn test_empty_key_file_is_fatal() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        fs::write(&settings.api_key_file, "\n").unwrap();
        fs::write(&settings.endpoints_file, ENDPOINTS).unwrap();

        let err = load_with_env(&settings, None).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyApiKey { .. }));
    }

    #[test]
    fn test_missing_or_partial_endpoints_are_fatal() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        fs::write(&settings.api_key_file, "k").unwrap();

        let err = load_with_env(&settings, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEndpoints { .. }));

        settings.endpoints_file = dir.path().join("partial.json");
        fs::write(&settings.endpoints_file, r#"{"url-google-geocode": "https://example.com/geo"}"#)
            .unwrap();
        match load_with_env(&settings, None).unwrap_err() {
            ConfigError::InvalidEndpoints { reason, .. } => {
                assert!(reason.contains("url-google-distance-matrix"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_toml_parsing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat_finder.toml");
        fs::write(
            &path,
            r#"
[maps]
api_key_file = "secrets/api.key"

[travel]
destination = "UCL Main Campus, London"
night_origin = "Fabric, London"
distance_from = "walking"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.maps.api_key_file, PathBuf::from("secrets/api.key"));
        assert_eq!(config.maps.endpoints_file, PathBuf::from(DEFAULT_ENDPOINTS_FILE));
        assert_eq!(config.travel.destination.as_deref(), Some("UCL Main Campus, London"));
        assert_eq!(
            config.travel.distance_policy().unwrap(),
            DistancePolicy::FromMode(TravelMode::Walking)
        );
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(config.travel.destination.is_none());
        assert_eq!(config.travel.distance_policy().unwrap(), DistancePolicy::LastSucceeded);
    }
}
