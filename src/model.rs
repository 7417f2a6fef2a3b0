//! GFS-Wave gridded model schedule and GRIB download fan-out
//!
//! GRIB2 decoding happens outside this crate. Decoded point values come back
//! in as [`ModelGridPoint`] and become `ModelGrid` observations.

use chrono::{DateTime, Duration, DurationRound, Utc};
use futures::{StreamExt, stream};
use tracing::{info, instrument, warn};

use crate::config::EndpointsConfig;
use crate::http::HttpClient;
use crate::location::Location;
use crate::observation::{Observation, Provenance};
use crate::swell::Swell;
use crate::units::{Units, degree_to_direction};
use crate::wave_physics::scalar_from_uv;

/// Concurrent GRIB downloads
pub const MAX_IN_FLIGHT: usize = 8;

/// Hours between model runs
const RUN_INTERVAL_HOURS: i64 = 6;
/// Hours after a run's nominal time before its output is published
const PUBLISH_DELAY_HOURS: i64 = 5;

/// A regular lat/lon wave model grid
#[derive(Debug, Clone, PartialEq)]
pub struct WaveModel {
    pub name: &'static str,
    pub subset: &'static str,
    pub description: &'static str,
    pub bottom_left: Location,
    pub top_right: Location,
    /// Grid spacing in degrees
    pub location_resolution: f64,
    /// Forecast-hour step after the hourly cutoff
    pub time_resolution_hours: u32,
    /// Last hourly forecast hour
    pub hourly_cutoff_index: u32,
    pub max_index: u32,
}

#[must_use]
pub fn atlantic_gfs_wave_model() -> WaveModel {
    WaveModel {
        name: "gfswave",
        subset: "atlocn.0p16",
        description: "GFS Wave Model: Atlantic 0.16 degree",
        bottom_left: Location::new(0.0, 260.0),
        top_right: Location::new(55.00011, 310.00011),
        location_resolution: 0.167,
        time_resolution_hours: 3,
        hourly_cutoff_index: 120,
        max_index: 384,
    }
}

#[must_use]
pub fn us_west_coast_gfs_wave_model() -> WaveModel {
    WaveModel {
        name: "gfswave",
        subset: "wcoast.0p16",
        description: "GFS Wave Model: US West Coast 0.16 degree",
        bottom_left: Location::new(25.0, 210.0),
        top_right: Location::new(50.00005, 250.00008),
        location_resolution: 0.167,
        time_resolution_hours: 3,
        hourly_cutoff_index: 120,
        max_index: 384,
    }
}

/// The newest run expected to be published at `now`
#[must_use]
pub fn latest_model_time(now: DateTime<Utc>) -> DateTime<Utc> {
    let published = now - Duration::hours(PUBLISH_DELAY_HOURS);
    published
        .duration_trunc(Duration::hours(RUN_INTERVAL_HOURS))
        .unwrap_or(published)
}

/// The run before `run`
#[must_use]
pub fn previous_model_time(run: DateTime<Utc>) -> DateTime<Utc> {
    run - Duration::hours(RUN_INTERVAL_HOURS)
}

impl WaveModel {
    #[must_use]
    pub fn contains_location(&self, location: &Location) -> bool {
        let lon = location.absolute_longitude();
        location.latitude > self.bottom_left.latitude
            && location.latitude < self.top_right.latitude
            && lon > self.bottom_left.absolute_longitude()
            && lon < self.top_right.absolute_longitude()
    }

    /// Grid (latitude, longitude) index of the cell containing `location`
    #[must_use]
    pub fn location_index(&self, location: &Location) -> Option<(usize, usize)> {
        if !self.contains_location(location) {
            return None;
        }
        let lat_offset = location.latitude - self.bottom_left.latitude;
        let lon_offset = location.absolute_longitude() - self.bottom_left.absolute_longitude();
        Some((
            (lat_offset / self.location_resolution) as usize,
            (lon_offset / self.location_resolution) as usize,
        ))
    }

    /// Position of `desired` in the run's output sequence: one step per hour
    /// up to the cutoff, then one per `time_resolution_hours`
    #[must_use]
    pub fn time_index(&self, run: DateTime<Utc>, desired: DateTime<Utc>) -> Option<u32> {
        let hours = u32::try_from((desired - run).num_hours()).ok()?;
        if hours < 1 || hours > self.max_index {
            return None;
        }
        if hours <= self.hourly_cutoff_index {
            return Some(hours);
        }
        Some(self.hourly_cutoff_index + (hours - self.hourly_cutoff_index) / self.time_resolution_hours)
    }

    /// Forecast hours in `[start, end)` that the model publishes
    #[must_use]
    pub fn forecast_hours(&self, start: u32, end: u32) -> Vec<u32> {
        (start..end.min(self.max_index + 1))
            .filter(|hour| {
                *hour <= self.hourly_cutoff_index
                    || (hour - self.hourly_cutoff_index) % self.time_resolution_hours == 0
            })
            .collect()
    }

    #[must_use]
    pub fn grib_url(&self, endpoints: &EndpointsConfig, run: DateTime<Utc>, forecast_hour: u32) -> String {
        let date = run.format("%Y%m%d");
        let hour = run.format("%H");
        format!(
            "{}/pub/data/nccf/com/gfs/prod/gfs.{date}/{hour}/wave/gridded/{}.t{hour}z.{}.f{forecast_hour:03}.grib2",
            endpoints.nomads_base_url, self.name, self.subset
        )
    }

    /// Download the GRIB files for `forecast_hours` of `run`, at most
    /// [`MAX_IN_FLIGHT`] at a time. Failed downloads are logged and left
    /// out; the rest come back ordered by forecast hour.
    #[instrument(skip(self, http, endpoints, forecast_hours), fields(model = self.subset))]
    pub async fn fetch_grib_messages(
        &self,
        http: &HttpClient,
        endpoints: &EndpointsConfig,
        run: DateTime<Utc>,
        forecast_hours: &[u32],
    ) -> Vec<(u32, Vec<u8>)> {
        let mut messages: Vec<(u32, Vec<u8>)> = stream::iter(forecast_hours.iter().copied())
            .map(|hour| {
                let url = self.grib_url(endpoints, run, hour);
                async move {
                    match http.fetch_bytes(&url).await {
                        Ok(bytes) => Some((hour, bytes)),
                        Err(e) => {
                            warn!("Skipping forecast hour {}: {}", hour, e);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(MAX_IN_FLIGHT)
            .filter_map(|message| async move { message })
            .collect()
            .await;

        messages.sort_by_key(|(hour, _)| *hour);
        info!(
            "Downloaded {} of {} GRIB messages",
            messages.len(),
            forecast_hours.len()
        );
        messages
    }
}

/// Height, period and direction of one model wave field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveField {
    pub height: f64,
    pub period: f64,
    pub direction: f64,
}

impl WaveField {
    fn to_swell(self) -> Option<Swell> {
        (self.height > 0.0 && self.period > 0.0 && self.direction > 0.0)
            .then(|| Swell::new(Units::Metric, self.height, self.period, self.direction))
    }
}

/// Decoded model values at one grid point and forecast time (metric)
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGridPoint {
    pub time: DateTime<Utc>,
    /// Combined sea state
    pub total: WaveField,
    pub primary_swell: WaveField,
    pub secondary_swell: WaveField,
    pub wind_wave: WaveField,
    /// 10 m wind vector, m/s
    pub wind_u: f64,
    pub wind_v: f64,
}

impl ModelGridPoint {
    #[must_use]
    pub fn to_observation(&self) -> Observation {
        let mut data = Observation::new(self.time, Units::Metric, Provenance::ModelGrid);
        data.wave_summary = Some(Swell::new(
            Units::Metric,
            self.total.height,
            self.total.period,
            self.total.direction,
        ));
        data.swell_components = [self.primary_swell, self.secondary_swell, self.wind_wave]
            .into_iter()
            .filter_map(WaveField::to_swell)
            .collect();

        let (speed, direction) = scalar_from_uv(self.wind_u, self.wind_v);
        data.wind_speed = speed;
        data.wind_direction = direction;
        data.wind_compass_direction = degree_to_direction(direction).to_string();
        data
    }
}
