//! Hourly grid construction and nearest-record matching

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use crate::observation::Observation;
use crate::tide::TidePrediction;

/// Hours of observations before the handoff hour
pub const ACTUAL_HOURS: i64 = 24;
/// Hours of forecast after the handoff hour
pub const FORECAST_HOURS: i64 = 168;
/// Largest gap between an actual cell and its wave record
pub const ACTUAL_WINDOW_MINUTES: i64 = 30;
/// Largest gap between a forecast cell and its wave record, the bulletin's
/// coarsest step
pub const FORECAST_WAVE_WINDOW_HOURS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Actual,
    Forecast,
}

/// Anything placed on the grid by time
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for Observation {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for TidePrediction {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// One grid hour and the records matched to it
#[derive(Debug, Clone)]
pub struct GridCell<'a> {
    pub grid_hour: DateTime<Utc>,
    pub kind: CellKind,
    pub wave: &'a Observation,
    pub wind: Option<&'a Observation>,
    pub tide: Option<&'a TidePrediction>,
}

/// The hour observations hand off to forecasts
#[must_use]
pub fn handoff_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

/// `handoff - 24h ..= handoff`
#[must_use]
pub fn actual_hours(handoff: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    (-ACTUAL_HOURS..=0)
        .map(|offset| handoff + Duration::hours(offset))
        .collect()
}

/// `handoff + 1h ..= handoff + 168h`
#[must_use]
pub fn forecast_hours(handoff: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    (1..=FORECAST_HOURS)
        .map(|offset| handoff + Duration::hours(offset))
        .collect()
}

/// Record closest in time to `target` from an ascending list, optionally
/// no farther than `window`. Ties go to the earlier record.
#[must_use]
pub fn nearest<T: Timestamped>(
    records: &[T],
    target: DateTime<Utc>,
    window: Option<Duration>,
) -> Option<&T> {
    let split = records.partition_point(|r| r.timestamp() < target);
    let before = split.checked_sub(1).and_then(|i| records.get(i));
    let after = records.get(split);

    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if target - b.timestamp() <= a.timestamp() - target {
                b
            } else {
                a
            }
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };

    match window {
        Some(window) if (best.timestamp() - target).abs() > window => None,
        _ => Some(best),
    }
}

/// Records feeding the grid, each in ascending time order
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSources<'a> {
    pub observed_waves: &'a [Observation],
    pub observed_wind: &'a [Observation],
    pub forecast_waves: &'a [Observation],
    pub forecast_wind: &'a [Observation],
    pub tides: &'a [TidePrediction],
}

/// Place records on the hourly grid around `handoff`.
///
/// Actual cells need a wave record within 30 minutes and take wind within
/// the same window. Forecast cells take the nearest records with no bound on
/// wind or tide. Cells without a wave record are left out.
#[must_use]
pub fn build_grid<'a>(handoff: DateTime<Utc>, sources: GridSources<'a>) -> Vec<GridCell<'a>> {
    let actual_window = Some(Duration::minutes(ACTUAL_WINDOW_MINUTES));
    let forecast_window = Some(Duration::hours(FORECAST_WAVE_WINDOW_HOURS));

    let actuals = actual_hours(handoff).into_iter().filter_map(|hour| {
        Some(GridCell {
            grid_hour: hour,
            kind: CellKind::Actual,
            wave: nearest(sources.observed_waves, hour, actual_window)?,
            wind: nearest(sources.observed_wind, hour, actual_window),
            tide: nearest(sources.tides, hour, actual_window),
        })
    });

    let forecasts = forecast_hours(handoff).into_iter().filter_map(|hour| {
        Some(GridCell {
            grid_hour: hour,
            kind: CellKind::Forecast,
            wave: nearest(sources.forecast_waves, hour, forecast_window)?,
            wind: nearest(sources.forecast_wind, hour, None),
            tide: nearest(sources.tides, hour, None),
        })
    });

    actuals.chain(forecasts).collect()
}
