//! Tide predictions from the CO-OPS datagetter API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EndpointsConfig;
use crate::units::{Measurement, Units, convert};
use crate::wave_physics::peakdetect;
use crate::{Result, SwellcastError};

/// Level difference that separates a high from a low when events have to be
/// derived from the prediction curve
const EVENT_DELTA: f64 = 0.05;

/// Vertical reference the water level is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TideDatum {
    #[serde(rename = "MHHW")]
    MeanHigherHighWater,
    #[serde(rename = "MHW")]
    MeanHighWater,
    #[serde(rename = "MTL")]
    MeanTideLevel,
    #[serde(rename = "MSL")]
    MeanSeaLevel,
    #[serde(rename = "MLW")]
    MeanLowWater,
    #[serde(rename = "MLLW")]
    MeanLowerLowWater,
}

impl TideDatum {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            TideDatum::MeanHigherHighWater => "MHHW",
            TideDatum::MeanHighWater => "MHW",
            TideDatum::MeanTideLevel => "MTL",
            TideDatum::MeanSeaLevel => "MSL",
            TideDatum::MeanLowWater => "MLW",
            TideDatum::MeanLowerLowWater => "MLLW",
        }
    }
}

/// Sampling of the prediction feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TideInterval {
    /// Six-minute samples
    Default,
    Hourly,
    HighLow,
}

impl TideInterval {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            TideInterval::Default => "",
            TideInterval::Hourly => "h",
            TideInterval::HighLow => "hilo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideEventType {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "L")]
    Low,
}

/// Predicted water level at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidePrediction {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub unit: Units,
    #[serde(with = "crate::serialize::nan")]
    pub water_level: f64,
    pub datum: TideDatum,
}

impl TidePrediction {
    #[must_use]
    pub fn in_units(&self, unit: Units) -> Self {
        Self {
            unit,
            water_level: convert(self.water_level, Measurement::Length, self.unit, unit),
            ..self.clone()
        }
    }
}

/// A high or low tide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub unit: Units,
    #[serde(with = "crate::serialize::nan")]
    pub water_level: f64,
    pub datum: TideDatum,
    pub event: TideEventType,
}

/// Parsed prediction feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TideData {
    pub predictions: Vec<TidePrediction>,
    pub events: Vec<TideEvent>,
}

#[derive(Debug, Deserialize)]
struct PredictionsJson {
    predictions: Option<Vec<PredictionJson>>,
    error: Option<ErrorJson>,
}

#[derive(Debug, Deserialize)]
struct PredictionJson {
    t: String,
    v: String,
    #[serde(rename = "type")]
    event: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorJson {
    message: String,
}

/// A tide prediction station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideStation {
    pub station_id: String,
    #[serde(default)]
    pub state: String,
}

impl TideStation {
    #[must_use]
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            state: String::new(),
        }
    }

    /// Datagetter URL for predictions between two instants (GMT)
    #[must_use]
    pub fn data_url(
        &self,
        endpoints: &EndpointsConfig,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        datum: TideDatum,
        interval: TideInterval,
        unit: Units,
    ) -> String {
        let unit = match unit {
            Units::English => "english",
            _ => "metric",
        };
        format!(
            "{}/api/datagetter?begin_date={}%20{}&end_date={}%20{}&station={}&product=predictions&datum={}&interval={}&units={}&time_zone=gmt&application=web_services&format=json",
            endpoints.tides_base_url,
            start.format("%Y%m%d"),
            start.format("%H:%M"),
            end.format("%Y%m%d"),
            end.format("%H:%M"),
            self.station_id,
            datum.code(),
            interval.code(),
            unit
        )
    }
}

fn parse_event_type(raw: &str) -> Option<TideEventType> {
    match raw.trim() {
        "H" | "HH" => Some(TideEventType::High),
        "L" | "LL" => Some(TideEventType::Low),
        _ => None,
    }
}

/// Parse a predictions response. When the feed carries no high/low markers,
/// events are derived from turning points in the water level.
pub fn parse_predictions(raw: &str, datum: TideDatum, unit: Units) -> Result<TideData> {
    let json: PredictionsJson = serde_json::from_str(raw)
        .map_err(|e| SwellcastError::parse(format!("Failed to parse tide predictions: {e}")))?;

    if let Some(error) = json.error {
        return Err(SwellcastError::parse(format!(
            "Tide service error: {}",
            error.message
        )));
    }
    let entries = json
        .predictions
        .ok_or_else(|| SwellcastError::parse("Tide response has no predictions"))?;

    let mut data = TideData::default();
    let mut parse_errors = 0;

    for entry in entries {
        let parsed = NaiveDateTime::parse_from_str(&entry.t, "%Y-%m-%d %H:%M")
            .map_err(|e| format!("bad time '{}': {e}", entry.t))
            .and_then(|t| {
                entry
                    .v
                    .trim()
                    .parse::<f64>()
                    .map(|v| (t.and_utc(), v))
                    .map_err(|e| format!("bad level '{}': {e}", entry.v))
            });

        let (timestamp, water_level) = match parsed {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping tide prediction: {}", e);
                parse_errors += 1;
                continue;
            }
        };

        if let Some(event) = entry.event.as_deref().and_then(parse_event_type) {
            data.events.push(TideEvent {
                timestamp,
                unit,
                water_level,
                datum,
                event,
            });
        }
        data.predictions.push(TidePrediction {
            timestamp,
            unit,
            water_level,
            datum,
        });
    }

    data.predictions.sort_by_key(|p| p.timestamp);
    if data.events.is_empty() {
        data.events = interpolate_tidal_events(&data.predictions);
    }
    data.events.sort_by_key(|e| e.timestamp);

    info!(
        "Parsed {} tide predictions and {} events ({} parse errors)",
        data.predictions.len(),
        data.events.len(),
        parse_errors
    );
    Ok(data)
}

/// Derive highs and lows from the turning points of a prediction series
#[must_use]
pub fn interpolate_tidal_events(predictions: &[TidePrediction]) -> Vec<TideEvent> {
    let levels: Vec<f64> = predictions.iter().map(|p| p.water_level).collect();
    let peaks = peakdetect(&levels, EVENT_DELTA);

    let event = |index: usize, event: TideEventType| {
        let p = &predictions[index];
        TideEvent {
            timestamp: p.timestamp,
            unit: p.unit,
            water_level: p.water_level,
            datum: p.datum,
            event,
        }
    };

    let mut events: Vec<TideEvent> = peaks
        .min_indexes()
        .into_iter()
        .map(|i| event(i, TideEventType::Low))
        .chain(
            peaks
                .max_indexes()
                .into_iter()
                .map(|i| event(i, TideEventType::High)),
        )
        .collect();
    events.sort_by_key(|e| e.timestamp);
    events
}
