//! Per-cell post-processing and the JSON payload of a surf forecast

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::grid::{CellKind, GridCell};
use crate::observation::Observation;
use crate::swell::{BreakingParams, sort_by_energy};
use crate::units::{self, Measurement, Units};

pub const NOT_AVAILABLE: &str = "N/A";
const FLAT: &str = "Flat";
const FEET: &str = "ft";
const KNOTS: &str = "kts";

/// Forecast for one spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfForecast {
    /// Model run the forecast cells came from, or "N/A"
    pub forecast_generated_at: String,
    pub timezone: String,
    pub forecast_data: Vec<ForecastCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCell {
    /// Grid hour in the spot's timezone
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub breaking_wave_height: BreakingWaveHeight,
    pub swell_components: Vec<SwellOutput>,
    pub wind: Option<WindOutput>,
    pub tide: Option<TideOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingWaveHeight {
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// "Flat", "m-M ft" or "N/A"
    pub label: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwellOutput {
    pub height: f64,
    pub period: f64,
    pub direction: String,
    pub direction_degrees: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindOutput {
    pub speed: Option<f64>,
    pub direction: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideOutput {
    pub height: f64,
    pub unit: String,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[must_use]
pub fn format_generated_at(run: Option<DateTime<Utc>>) -> String {
    run.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |run| run.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

impl BreakingWaveHeight {
    /// Round a breaking range in feet for display
    #[must_use]
    pub fn from_feet(min: f64, max: f64) -> Self {
        let (min, max, label) = if min.is_nan() || max.is_nan() {
            (None, None, NOT_AVAILABLE.to_string())
        } else if max.round() <= 0.0 {
            (Some(0), Some(0), FLAT.to_string())
        } else {
            let upper = max.round() as i64;
            let lower = (min.round() as i64).min(upper - 1).max(0);
            (Some(lower), Some(upper), format!("{lower}-{upper} {FEET}"))
        };
        Self {
            min,
            max,
            label,
            unit: FEET.to_string(),
        }
    }
}

/// Wave record of a cell ready for output: model forecasts are flipped to
/// "toward" first, then the breaking range is solved on the emitted directions
#[must_use]
pub fn process_wave(wave: &Observation, kind: CellKind, params: &BreakingParams) -> Observation {
    let mut processed = wave.clone();

    if kind == CellKind::Forecast && wave.provenance.emits_toward_direction() {
        processed.swell_components = processed
            .swell_components
            .iter()
            .map(|swell| swell.flipped())
            .collect();
        processed.wave_summary = processed.wave_summary.map(|summary| summary.flipped());
    }
    processed.solve_breaking_wave_heights(params);
    sort_by_energy(&mut processed.swell_components);
    processed
}

fn swell_output(wave: &Observation) -> Vec<SwellOutput> {
    wave.swell_components
        .iter()
        .filter(|swell| swell.is_valid() && swell.wave_height > 0.0)
        .map(|swell| {
            let feet = swell.in_units(Units::English);
            SwellOutput {
                height: round1(feet.wave_height),
                period: round1(feet.period),
                direction: feet.compass_direction.clone(),
                direction_degrees: feet.direction.round(),
                unit: FEET.to_string(),
            }
        })
        .collect()
}

fn wind_output(wind: &Observation) -> WindOutput {
    let knots = units::convert(wind.wind_speed, Measurement::Speed, wind.unit, Units::Knots);
    WindOutput {
        speed: knots.is_finite().then(|| round1(knots)),
        direction: if wind.wind_compass_direction.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            wind.wind_compass_direction.clone()
        },
        unit: KNOTS.to_string(),
    }
}

impl ForecastCell {
    #[must_use]
    pub fn from_grid_cell(cell: &GridCell<'_>, params: &BreakingParams, tz: Tz) -> Self {
        let wave = process_wave(cell.wave, cell.kind, params);
        let to_feet = |value| units::convert(value, Measurement::Length, wave.unit, Units::English);

        let tide = cell.tide.and_then(|tide| {
            let feet = units::convert(tide.water_level, Measurement::Length, tide.unit, Units::English);
            feet.is_finite().then(|| TideOutput {
                height: round1(feet),
                unit: FEET.to_string(),
            })
        });

        Self {
            timestamp: cell.grid_hour.with_timezone(&tz).to_rfc3339(),
            kind: match cell.kind {
                CellKind::Actual => "actual".to_string(),
                CellKind::Forecast => "forecast".to_string(),
            },
            breaking_wave_height: BreakingWaveHeight::from_feet(
                to_feet(wave.minimum_breaking_height),
                to_feet(wave.maximum_breaking_height),
            ),
            swell_components: swell_output(&wave),
            wind: cell.wind.map(wind_output),
            tide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Provenance;
    use crate::swell::Swell;
    use chrono::TimeZone;

    fn narragansett() -> BreakingParams {
        BreakingParams {
            depth: 30.0,
            angle: 145.0,
            slope: 0.02,
        }
    }

    fn wave(provenance: Provenance, direction: f64) -> Observation {
        let time = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut wave = Observation::new(time, Units::Metric, provenance);
        wave.swell_components = vec![Swell::new(Units::Metric, 1.5, 10.0, direction)];
        wave
    }

    #[test]
    fn test_breaking_labels() {
        let flat = BreakingWaveHeight::from_feet(0.0, 0.0);
        assert_eq!(flat.label, "Flat");
        assert_eq!(flat.max, Some(0));

        let range = BreakingWaveHeight::from_feet(3.9, 5.46);
        assert_eq!(range.label, "4-5 ft");

        // a rounded minimum equal to the maximum drops one foot
        let range = BreakingWaveHeight::from_feet(1.2, 1.4);
        assert_eq!(range.label, "0-1 ft");
        assert_eq!((range.min, range.max), (Some(0), Some(1)));

        let missing = BreakingWaveHeight::from_feet(f64::NAN, f64::NAN);
        assert_eq!(missing.label, "N/A");
        assert!(missing.min.is_none());
    }

    #[test]
    fn test_bulletin_forecast_is_flipped() {
        let processed = process_wave(&wave(Provenance::Bulletin, 90.0), CellKind::Forecast, &narragansett());
        assert_eq!(processed.swell_components[0].direction, 270.0);
        assert_eq!(processed.swell_components[0].compass_direction, "W");
    }

    #[test]
    fn test_observed_direction_passes_through() {
        let processed = process_wave(&wave(Provenance::Spectral, 90.0), CellKind::Actual, &narragansett());
        assert_eq!(processed.swell_components[0].direction, 90.0);
    }

    #[test]
    fn test_breaking_solved_after_flip() {
        // from 180° reaches a shore facing 145°, toward 0° does not
        let from = wave(Provenance::Bulletin, 180.0);
        let actual = process_wave(&from, CellKind::Actual, &narragansett());
        let forecast = process_wave(&from, CellKind::Forecast, &narragansett());

        assert!(actual.maximum_breaking_height > 0.0);
        assert_eq!(forecast.swell_components[0].direction, 0.0);
        assert_eq!(forecast.maximum_breaking_height, 0.0);
        assert_eq!(forecast.minimum_breaking_height, 0.0);
    }

    #[test]
    fn test_generated_at() {
        assert_eq!(format_generated_at(None), "N/A");
        let run = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        assert_eq!(format_generated_at(Some(run)), "2024-06-01T06:00:00Z");
    }
}
