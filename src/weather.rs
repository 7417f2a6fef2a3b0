//! Hourly point forecasts from api.weather.gov
//!
//! A forecast is two requests: `points/{lat},{lon}` resolves the forecast
//! office grid cell, then `gridpoints/{office}/{x},{y}/forecast/hourly`
//! returns the periods.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::EndpointsConfig;
use crate::location::Location;
use crate::observation::{Observation, Provenance};
use crate::units::{self, Units};
use crate::{Result, SwellcastError};

/// Forecast office grid cell covering a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPoint {
    pub office: String,
    pub grid_x: i64,
    pub grid_y: i64,
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    grid_id: Option<String>,
    grid_x: Option<i64>,
    grid_y: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPeriod {
    start_time: String,
    temperature: Option<f64>,
    #[serde(default)]
    short_forecast: Option<String>,
    #[serde(default)]
    wind_speed: Option<String>,
    #[serde(default)]
    wind_direction: Option<String>,
}

#[must_use]
pub fn points_url(endpoints: &EndpointsConfig, location: &Location) -> String {
    format!(
        "{}/points/{:.4},{:.4}",
        endpoints.weather_base_url,
        location.latitude,
        location.signed_longitude()
    )
}

#[must_use]
pub fn hourly_forecast_url(endpoints: &EndpointsConfig, grid: &GridPoint) -> String {
    format!(
        "{}/gridpoints/{}/{},{}/forecast/hourly",
        endpoints.weather_base_url, grid.office, grid.grid_x, grid.grid_y
    )
}

/// Resolve the grid cell from a `points` response
pub fn parse_points(raw: &str) -> Result<GridPoint> {
    let response: PointsResponse = serde_json::from_str(raw)
        .map_err(|e| SwellcastError::parse(format!("Failed to parse points response: {e}")))?;
    let PointsProperties {
        grid_id: Some(office),
        grid_x: Some(grid_x),
        grid_y: Some(grid_y),
    } = response.properties
    else {
        return Err(SwellcastError::not_found("Location is outside the forecast grid"));
    };

    Ok(GridPoint {
        office,
        grid_x,
        grid_y,
    })
}

/// Leading number of a wind speed such as `"10 mph"` or `"5 to 10 mph"`
fn parse_wind_speed(raw: &str) -> f64 {
    raw.split_whitespace()
        .next()
        .map_or(f64::NAN, units::parse_float)
}

/// Parse hourly periods into english-unit weather records, oldest first
pub fn parse_hourly_forecast(raw: &str) -> Result<Vec<Observation>> {
    let response: ForecastResponse = serde_json::from_str(raw)
        .map_err(|e| SwellcastError::parse(format!("Failed to parse hourly forecast: {e}")))?;

    let mut records = Vec::new();
    let mut parse_errors = 0;

    for period in response.properties.periods {
        let timestamp = match DateTime::parse_from_rfc3339(&period.start_time) {
            Ok(time) => time.with_timezone(&Utc),
            Err(e) => {
                warn!("Skipping forecast period '{}': {}", period.start_time, e);
                parse_errors += 1;
                continue;
            }
        };

        let mut data = Observation::new(timestamp, Units::English, Provenance::WeatherForecast);
        data.air_temperature = period.temperature.unwrap_or(f64::NAN);
        data.short_forecast = period.short_forecast;
        data.wind_speed = period.wind_speed.as_deref().map_or(f64::NAN, parse_wind_speed);
        if let Some(compass) = period.wind_direction.filter(|d| !d.is_empty()) {
            data.wind_direction = units::direction_to_degree(&compass).unwrap_or(f64::NAN);
            data.wind_compass_direction = compass;
        }
        records.push(data);
    }

    records.sort_by_key(|record| record.timestamp);
    info!(
        "Parsed {} hourly weather periods ({} parse errors)",
        records.len(),
        parse_errors
    );
    Ok(records)
}
