use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tempfile::{tempdir, TempDir};

use flat_finder::config::{Config, MapsSettings, TravelSettings};
use flat_finder::infra::StubHttp;
use flat_finder::{
    Column, ConfigError, DistancePolicy, EnrichmentPipeline, EnrichmentStep, Listing,
    ListingTable, TravelMode, TravelOverrides,
};

const GEOCODE_URL: &str = "https://maps.test/geocode/json";

fn maps_settings(dir: &Path) -> MapsSettings {
    MapsSettings {
        api_key_file: dir.join("api.key"),
        endpoints_file: dir.join("endpoints.json"),
    }
}

/// Key and endpoint files on disk plus a config pointing at them.
fn config_with_maps(travel: TravelSettings) -> Result<(TempDir, Config)> {
    let dir = tempdir()?;
    let maps = maps_settings(dir.path());
    fs::write(&maps.api_key_file, "file-key\n")?;
    fs::write(
        &maps.endpoints_file,
        json!({
            "url-google-geocode": GEOCODE_URL,
            "url-google-distance-matrix": "https://maps.test/distancematrix/json"
        })
        .to_string(),
    )?;
    Ok((dir, Config { maps, travel }))
}

fn travel(destination: Option<&str>, night_origin: Option<&str>) -> TravelSettings {
    TravelSettings {
        destination: destination.map(str::to_string),
        night_origin: night_origin.map(str::to_string),
        distance_from: None,
    }
}

#[test]
fn test_no_steps_skips_maps_configuration() -> Result<()> {
    let dir = tempdir()?;
    let config = Config {
        maps: maps_settings(dir.path()),
        travel: TravelSettings::default(),
    };
    let stub = Arc::new(StubHttp::new());

    let pipeline =
        EnrichmentPipeline::from_config(&config, &TravelOverrides::default(), &[], stub.clone())?;

    assert!(pipeline.is_none());
    assert!(stub.requests().is_empty());
    Ok(())
}

#[test]
fn test_missing_destination_is_fatal() -> Result<()> {
    let (_dir, config) = config_with_maps(travel(None, None))?;
    let stub = Arc::new(StubHttp::new());

    let err = EnrichmentPipeline::from_config(
        &config,
        &TravelOverrides::default(),
        &[EnrichmentStep::Distances],
        stub.clone(),
    )
    .err();

    assert!(matches!(err, Some(ConfigError::MissingDestination)));
    assert!(stub.requests().is_empty());
    Ok(())
}

#[test]
fn test_missing_endpoints_file_is_fatal() -> Result<()> {
    let (dir, config) = config_with_maps(travel(Some("UCL Main Campus, London"), None))?;
    fs::remove_file(dir.path().join("endpoints.json"))?;
    let stub = Arc::new(StubHttp::new());

    let err = EnrichmentPipeline::from_config(
        &config,
        &TravelOverrides::default(),
        &[EnrichmentStep::Coordinates],
        stub.clone(),
    )
    .err();

    assert!(matches!(err, Some(ConfigError::MissingEndpoints { .. })));
    assert!(stub.requests().is_empty());
    Ok(())
}

#[test]
fn test_night_step_needs_a_night_origin() -> Result<()> {
    let (_dir, config) = config_with_maps(travel(Some("UCL Main Campus, London"), None))?;
    let stub = Arc::new(StubHttp::new());
    let steps = [EnrichmentStep::Distances, EnrichmentStep::ReturnAtNight];

    let err =
        EnrichmentPipeline::from_config(&config, &TravelOverrides::default(), &steps, stub.clone())
            .err();
    assert!(matches!(err, Some(ConfigError::MissingNightOrigin)));
    assert!(stub.requests().is_empty());

    // A night origin from the command line is enough
    let overrides = TravelOverrides {
        night_origin: Some("Soho, London".to_string()),
        ..Default::default()
    };
    let pipeline = EnrichmentPipeline::from_config(&config, &overrides, &steps, stub.clone())?
        .expect("pipeline for non-empty steps");
    assert_eq!(pipeline.night_origin(), Some("Soho, London"));
    Ok(())
}

#[test]
fn test_command_line_overrides_config_file() -> Result<()> {
    let mut settings = travel(Some("UCL Main Campus, London"), Some("Soho, London"));
    settings.distance_from = Some("walking".to_string());
    let (_dir, config) = config_with_maps(settings)?;
    let stub = Arc::new(StubHttp::new());
    let steps = [EnrichmentStep::Distances];

    let from_file =
        EnrichmentPipeline::from_config(&config, &TravelOverrides::default(), &steps, stub.clone())?
            .expect("pipeline for non-empty steps");
    assert_eq!(from_file.destination(), "UCL Main Campus, London");
    assert_eq!(from_file.night_origin(), Some("Soho, London"));
    assert_eq!(
        from_file.distance_policy(),
        DistancePolicy::FromMode(TravelMode::Walking)
    );

    let overrides = TravelOverrides {
        destination: Some("King's Cross, London".to_string()),
        night_origin: Some("Shoreditch, London".to_string()),
        distance_from: Some("transit".to_string()),
    };
    let overridden = EnrichmentPipeline::from_config(&config, &overrides, &steps, stub.clone())?
        .expect("pipeline for non-empty steps");
    assert_eq!(overridden.destination(), "King's Cross, London");
    assert_eq!(overridden.night_origin(), Some("Shoreditch, London"));
    assert_eq!(
        overridden.distance_policy(),
        DistancePolicy::FromMode(TravelMode::Transit)
    );
    assert!(stub.requests().is_empty());
    Ok(())
}

#[test]
fn test_unknown_distance_mode_is_fatal() -> Result<()> {
    let (_dir, config) = config_with_maps(travel(Some("UCL Main Campus, London"), None))?;
    let stub = Arc::new(StubHttp::new());
    let overrides = TravelOverrides {
        distance_from: Some("teleport".to_string()),
        ..Default::default()
    };

    let err = EnrichmentPipeline::from_config(
        &config,
        &overrides,
        &[EnrichmentStep::Distances],
        stub.clone(),
    )
    .err();

    assert!(matches!(err, Some(ConfigError::UnknownTravelMode(mode)) if mode == "teleport"));
    assert!(stub.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_configured_pipeline_uses_endpoints_file() -> Result<()> {
    let (_dir, config) = config_with_maps(travel(Some("UCL Main Campus, London"), None))?;
    let stub = Arc::new(StubHttp::new().respond_to_url(
        GEOCODE_URL,
        200,
        json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 51.52, "lng": -0.13}}}]
        })
        .to_string(),
    ));
    let steps = [EnrichmentStep::Coordinates];

    let pipeline =
        EnrichmentPipeline::from_config(&config, &TravelOverrides::default(), &steps, stub.clone())?
            .expect("pipeline for non-empty steps");
    let table = ListingTable::new(vec![Listing::new("UCL Main Campus, London")]);
    let out = pipeline.enrich(table, &steps).await?;

    assert_eq!(out.value(0, Column::Latitude), Some(51.52));
    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, GEOCODE_URL);
    assert!(requests[0].param("key").is_some());
    Ok(())
}
