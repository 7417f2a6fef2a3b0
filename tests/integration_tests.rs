//! End-to-end scenarios over recorded upstream fixtures

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rstest::rstest;

use swellcast::config::SwellcastConfig;
use swellcast::forecast::{ForecastSources, SurfForecastService};
use swellcast::swell::{BreakingParams, Swell, sort_by_energy};
use swellcast::tide::{TideDatum, TidePrediction, parse_predictions};
use swellcast::units::{self, Units};
use swellcast::wave_physics::breaking_characteristics;
use swellcast::{BulletinParser, BuoyParser, Location, Observation, Spectrum, SwellcastError, weather};

const LATEST_REPORT: &str = include_str!("fixtures/44097.latest_obs.txt");
const ENERGY_SPECTRA: &str = include_str!("fixtures/44097.data_spec");
const DIRECTIONAL_SPECTRA: &str = include_str!("fixtures/44097.swdir");
const REALTIME_MET: &str = include_str!("fixtures/44097.txt");
const BULLETIN: &str = include_str!("fixtures/gfswave.44097.bull");
const ROLLOVER_BULLETIN: &str = include_str!("fixtures/gfswave.44097.rollover.bull");
const TIDES: &str = include_str!("fixtures/tides_8452660.json");
const HOURLY_FORECAST: &str = include_str!("fixtures/hourly_forecast.json");

/// Upstream feeds served from fixtures through the production parsers
struct FixtureSources {
    bulletin_run: DateTime<Utc>,
}

#[async_trait]
impl ForecastSources for FixtureSources {
    async fn wave_observations(
        &self,
        _buoy_id: &str,
        _now: DateTime<Utc>,
    ) -> swellcast::Result<Vec<Observation>> {
        BuoyParser::new().parse_spectra(ENERGY_SPECTRA, DIRECTIONAL_SPECTRA, None)
    }

    async fn wind_observations(
        &self,
        _buoy_id: &str,
        _now: DateTime<Utc>,
    ) -> swellcast::Result<Vec<Observation>> {
        BuoyParser::new().parse_realtime_met(REALTIME_MET)
    }

    async fn tide_predictions(
        &self,
        _station_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> swellcast::Result<Vec<TidePrediction>> {
        Ok(parse_predictions(TIDES, TideDatum::MeanLowerLowWater, Units::English)?.predictions)
    }

    async fn wave_bulletin(
        &self,
        buoy_id: &str,
        model_run: DateTime<Utc>,
    ) -> swellcast::Result<Vec<Observation>> {
        if model_run == self.bulletin_run {
            BulletinParser::parse(BULLETIN)
        } else {
            Err(SwellcastError::fetch(format!("no bulletin for {buoy_id} at {model_run}")))
        }
    }

    async fn hourly_weather(&self, _location: &Location) -> swellcast::Result<Vec<Observation>> {
        weather::parse_hourly_forecast(HOURLY_FORECAST)
    }
}

fn narragansett() -> BreakingParams {
    BreakingParams {
        depth: 30.0,
        angle: 145.0,
        slope: 0.02,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 21, 55, 0).unwrap()
}

fn service(bulletin_run: DateTime<Utc>) -> SurfForecastService {
    SurfForecastService::new(
        Arc::new(SwellcastConfig::default()),
        Arc::new(FixtureSources { bulletin_run }),
    )
}

#[test]
fn test_latest_report_components() {
    let report = BuoyParser::new().parse_latest_report(LATEST_REPORT).unwrap();

    let summary = report.wave_summary.as_ref().unwrap();
    assert_eq!(summary.wave_height, 3.0);
    assert_eq!(summary.period, 9.0);
    // period 8 is closer to the peak period than 4
    assert_eq!(summary.compass_direction, "NE");

    assert_eq!(report.swell_components.len(), 2);
    let heights: Vec<f64> = report.swell_components.iter().map(|s| s.wave_height).collect();
    assert_eq!(heights, vec![2.5, 1.5]);
    let periods: Vec<f64> = report.swell_components.iter().map(|s| s.period).collect();
    assert_eq!(periods, vec![8.0, 4.0]);
    let compass: Vec<&str> = report
        .swell_components
        .iter()
        .map(|s| s.compass_direction.as_str())
        .collect();
    assert_eq!(compass, vec!["NE", "S"]);

    assert_eq!(report.wind_direction, 0.0);
    assert!((report.wind_gust - 15.0 * 1.15).abs() < 1e-9);
}

#[test]
fn test_spectrum_decomposition() {
    let spectrum = Spectrum::new(
        vec![0.05, 0.07, 0.09, 0.11, 0.13, 0.15, 0.17],
        vec![0.1, 0.2, 1.5, 0.3, 0.1, 0.9, 0.2],
        vec![200.0, 205.0, 210.0, 220.0, 230.0, 150.0, 155.0],
        0.1,
    );
    let mut components = spectrum.swell_components(0.05);
    sort_by_energy(&mut components);

    assert_eq!(components.len(), 2);
    assert!((components[0].period - 1.0 / 0.09).abs() < 1e-9);
    assert_eq!(components[0].direction, 210.0);
    assert_eq!(components[1].direction, 150.0);
    assert!((components[1].period - 1.0 / 0.15).abs() < 1e-9);
    assert_eq!(components[0].max_energy, Some(1.5));
    assert_eq!(components[1].max_energy, Some(0.9));
}

#[test]
fn test_breaking_wave_at_narragansett() {
    let swell = Swell::new(Units::Metric, 1.5, 10.0, 180.0);
    let range = swell.breaking_wave_estimate(&narragansett()).unwrap();

    let expected = breaking_characteristics(10.0, 35.0, 1.5, 0.02, 30.0).wave_height * 0.8;
    assert!(expected > 0.0);
    assert!((range.max - expected).abs() < 1e-9);
    assert!((range.min - range.max / 1.4).abs() < 1e-9);
}

#[test]
fn test_bulletin_year_rollover() {
    let records = BulletinParser::parse(ROLLOVER_BULLETIN).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].timestamp,
        Utc.with_ymd_and_hms(2024, 12, 31, 18, 0, 0).unwrap()
    );
    assert_eq!(
        records[1].timestamp,
        Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_actual_cells_without_nearby_wind() {
    let run = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let forecast = service(run).get_surf_forecast_at("narragansett", now()).await.unwrap();

    let actuals: Vec<_> = forecast
        .forecast_data
        .iter()
        .filter(|cell| cell.kind == "actual")
        .collect();
    assert_eq!(actuals.len(), 2);
    assert_eq!(actuals[1].timestamp, "2024-06-01T17:00:00-04:00");
    for cell in &actuals {
        assert!(!cell.swell_components.is_empty());
        assert!(cell.wind.is_none());
        assert!(cell.tide.is_some());
    }
}

#[tokio::test]
async fn test_forecast_cells_point_toward() {
    let run = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let forecast = service(run).get_surf_forecast_at("narragansett", now()).await.unwrap();
    assert_eq!(forecast.forecast_generated_at, "2024-06-01T12:00:00Z");
    assert_eq!(forecast.timezone, "America/New_York");

    let first = forecast
        .forecast_data
        .iter()
        .find(|cell| cell.kind == "forecast")
        .unwrap();
    // the 22z bulletin row reports swell from 90°
    assert_eq!(first.timestamp, "2024-06-01T18:00:00-04:00");
    assert_eq!(first.swell_components[0].direction_degrees, 270.0);
    assert_eq!(first.swell_components[0].direction, "W");

    let wind = first.wind.as_ref().unwrap();
    assert_eq!(wind.direction, "SW");
    assert_eq!(wind.unit, "kts");
    assert_eq!(wind.speed, Some(8.7));
}

#[tokio::test]
async fn test_forecast_invariants() {
    let run = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let forecast = service(run).get_surf_forecast_at("narragansett", now()).await.unwrap();

    // two actual hours, then 22z through 03z from the bulletin
    assert_eq!(forecast.forecast_data.len(), 8);

    let hours: Vec<DateTime<Utc>> = forecast
        .forecast_data
        .iter()
        .map(|cell| {
            DateTime::parse_from_rfc3339(&cell.timestamp)
                .unwrap()
                .with_timezone(&Utc)
        })
        .collect();
    assert!(hours.windows(2).all(|w| w[0] < w[1]));

    for cell in &forecast.forecast_data {
        let breaking = &cell.breaking_wave_height;
        if let (Some(min), Some(max)) = (breaking.min, breaking.max) {
            assert!(min <= max);
        }
        if breaking.label == "Flat" {
            assert_eq!(breaking.max, Some(0));
        }
    }
}

#[tokio::test]
async fn test_missing_bulletin_is_not_available() {
    let stale = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let forecast = service(stale).get_surf_forecast_at("narragansett", now()).await.unwrap();

    assert_eq!(forecast.forecast_generated_at, "N/A");
    assert!(forecast.forecast_data.iter().all(|cell| cell.kind == "actual"));

    let json = serde_json::to_value(&forecast).unwrap();
    assert_eq!(json["forecast_data"][0]["type"], "actual");
    assert!(json["forecast_data"][0]["wind"].is_null());
}

#[tokio::test]
async fn test_unknown_spot() {
    let run = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    assert!(service(run).get_surf_forecast_at("atlantis", now()).await.is_none());
}

#[rstest]
#[case(0.0, "N")]
#[case(90.0, "E")]
#[case(202.5, "SSW")]
#[case(359.0, "N")]
fn test_compass_labels(#[case] degrees: f64, #[case] label: &str) {
    assert_eq!(units::degree_to_direction(degrees), label);
    if degrees % 22.5 == 0.0 {
        assert_eq!(units::direction_to_degree(label), Some(degrees));
    }
}
