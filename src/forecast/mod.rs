//! Fusion of buoy observations, model bulletins, tides and weather into an
//! hourly surf forecast for one spot

pub mod grid;
pub mod output;
pub mod sources;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

pub use grid::{CellKind, GridCell, GridSources, build_grid, handoff_hour, nearest};
pub use output::{ForecastCell, SurfForecast, format_generated_at};
pub use sources::{ForecastSources, NoaaSources};

use crate::config::{SpotConfig, SwellcastConfig};
use crate::model::{latest_model_time, previous_model_time};
use crate::observation::Observation;
use crate::{Result, SwellcastError};

/// Days of tide predictions fetched past the handoff hour
const TIDE_FORECAST_DAYS: i64 = 7;

#[derive(Clone)]
pub struct SurfForecastService {
    config: Arc<SwellcastConfig>,
    sources: Arc<dyn ForecastSources>,
}

/// Records fetched for one forecast request
#[derive(Debug, Default)]
struct FetchedSources {
    observed_waves: Vec<Observation>,
    observed_wind: Vec<Observation>,
    forecast_waves: Vec<Observation>,
    forecast_wind: Vec<Observation>,
    tides: Vec<crate::tide::TidePrediction>,
    generated_at: Option<DateTime<Utc>>,
}

fn or_empty<T>(source: &str, spot: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!("{} unavailable for {}: {}", source, spot, e.user_message());
        Vec::new()
    })
}

/// Records inside `[start, end]`
fn within(records: Vec<Observation>, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Observation> {
    records
        .into_iter()
        .filter(|r| r.timestamp >= start && r.timestamp <= end)
        .collect()
}

impl SurfForecastService {
    #[must_use]
    pub fn new(config: Arc<SwellcastConfig>, sources: Arc<dyn ForecastSources>) -> Self {
        Self { config, sources }
    }

    #[must_use]
    pub fn config(&self) -> &SwellcastConfig {
        &self.config
    }

    /// Forecast for a configured spot as of now, `None` for an unknown spot
    pub async fn get_surf_forecast(&self, spot_name: &str) -> Option<SurfForecast> {
        self.get_surf_forecast_at(spot_name, Utc::now()).await
    }

    /// Forecast for a configured spot as of `now`.
    ///
    /// Upstream failures never fail the request: a missing source leaves its
    /// cells out (waves) or its fields empty (wind, tide).
    #[instrument(skip(self))]
    pub async fn get_surf_forecast_at(
        &self,
        spot_name: &str,
        now: DateTime<Utc>,
    ) -> Option<SurfForecast> {
        let Some(spot) = self.config.find_spot(spot_name) else {
            warn!("Unknown spot '{}'", spot_name);
            return None;
        };

        let handoff = handoff_hour(now);
        let fetched = self.fetch_sources(spot, now, handoff).await;

        let tz = spot.tz();
        let cells = build_grid(
            handoff,
            GridSources {
                observed_waves: &fetched.observed_waves,
                observed_wind: &fetched.observed_wind,
                forecast_waves: &fetched.forecast_waves,
                forecast_wind: &fetched.forecast_wind,
                tides: &fetched.tides,
            },
        );
        let forecast_data: Vec<ForecastCell> = cells
            .iter()
            .map(|cell| ForecastCell::from_grid_cell(cell, &spot.breaking, tz))
            .collect();

        info!(
            "Built forecast for {} with {} cells ({} actual)",
            spot.name,
            forecast_data.len(),
            cells.iter().filter(|c| c.kind == CellKind::Actual).count()
        );

        Some(SurfForecast {
            forecast_generated_at: format_generated_at(fetched.generated_at),
            timezone: tz.name().to_string(),
            forecast_data,
        })
    }

    async fn fetch_sources(
        &self,
        spot: &SpotConfig,
        now: DateTime<Utc>,
        handoff: DateTime<Utc>,
    ) -> FetchedSources {
        let history_start =
            handoff - Duration::hours(grid::ACTUAL_HOURS) - Duration::minutes(grid::ACTUAL_WINDOW_MINUTES);
        let tide_end = handoff + Duration::days(TIDE_FORECAST_DAYS);
        let wind_location = spot.wind_location();

        let (waves, wind, tides, bulletin, weather) = tokio::join!(
            self.sources.wave_observations(&spot.swell_buoy_id, now),
            self.sources.wind_observations(&spot.met_buoy_id, now),
            self.sources.tide_predictions(&spot.tide_station_id, history_start, tide_end),
            self.fetch_bulletin(&spot.swell_buoy_id, now),
            self.sources.hourly_weather(&wind_location),
        );

        let (forecast_waves, generated_at) = match bulletin {
            Ok((records, run)) => (records, Some(run)),
            Err(e) => {
                warn!("Wave bulletin unavailable for {}: {}", spot.name, e.user_message());
                (Vec::new(), None)
            }
        };

        FetchedSources {
            observed_waves: within(or_empty("Wave observations", &spot.name, waves), history_start, now),
            observed_wind: within(or_empty("Wind observations", &spot.name, wind), history_start, now),
            forecast_waves,
            forecast_wind: or_empty("Hourly weather", &spot.name, weather),
            tides: or_empty("Tide predictions", &spot.name, tides),
            generated_at,
        }
    }

    /// Bulletin of the latest model run, falling back once to the run before
    async fn fetch_bulletin(
        &self,
        buoy_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Observation>, DateTime<Utc>)> {
        let latest = latest_model_time(now);
        match self.try_bulletin(buoy_id, latest).await {
            Ok(records) => return Ok((records, latest)),
            Err(e) => warn!(
                "No bulletin for {} at {}: {}, trying the previous run",
                buoy_id,
                latest,
                e.user_message()
            ),
        }

        let previous = previous_model_time(latest);
        let records = self.try_bulletin(buoy_id, previous).await?;
        Ok((records, previous))
    }

    async fn try_bulletin(&self, buoy_id: &str, run: DateTime<Utc>) -> Result<Vec<Observation>> {
        let records = self.sources.wave_bulletin(buoy_id, run).await?;
        if records.is_empty() {
            return Err(SwellcastError::not_found(format!(
                "Bulletin for {buoy_id} at {run} has no records"
            )));
        }
        Ok(records)
    }
}
