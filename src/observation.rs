//! Canonical observation/forecast record shared by every data source

use chrono::{DateTime, Duration, DurationRound, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spectrum::Spectrum;
use crate::swell::{BreakingParams, Swell};
use crate::units::{self, Measurement, Units};

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Free-form latest observation report
    LatestReport,
    /// Realtime standard meteorological table
    Realtime,
    /// Realtime detailed wave summary table
    Detailed,
    /// Realtime spectral density files
    Spectral,
    /// Wave model point bulletin
    Bulletin,
    /// Wave model gridded output
    ModelGrid,
    /// Hourly weather service forecast
    WeatherForecast,
}

impl Provenance {
    /// Whether the record was produced by a model rather than measured
    #[must_use]
    pub fn is_forecast(self) -> bool {
        matches!(
            self,
            Provenance::Bulletin | Provenance::ModelGrid | Provenance::WeatherForecast
        )
    }

    /// Whether wave directions from this source are flipped to "going toward"
    /// when emitted in a forecast cell
    #[must_use]
    pub fn emits_toward_direction(self) -> bool {
        matches!(self, Provenance::Bulletin | Provenance::ModelGrid)
    }
}

/// Wall-clock minutes at which the buoy feeds refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationPolicy {
    pub first_refresh_minute: u32,
    pub second_refresh_minute: u32,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            first_refresh_minute: 35,
            second_refresh_minute: 50,
        }
    }
}

impl ExpirationPolicy {
    /// The next refresh boundary after `now`
    #[must_use]
    pub fn next_expiration(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour = now
            .duration_trunc(Duration::hours(1))
            .unwrap_or(now);
        let first = Duration::minutes(i64::from(self.first_refresh_minute));
        let second = Duration::minutes(i64::from(self.second_refresh_minute));

        match now.minute() {
            m if m < 2 => hour + first,
            m if m < self.second_refresh_minute => hour + second,
            _ => hour + Duration::hours(1) + first,
        }
    }
}

/// One timestamped reading or forecast step.
///
/// Every numeric field uses NaN for "not observed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub unit: Units,
    pub provenance: Provenance,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expiration_time: Option<DateTime<Utc>>,

    // waves
    #[serde(default, with = "crate::serialize::tagged_option")]
    pub wave_summary: Option<Swell>,
    #[serde(default, with = "crate::serialize::tagged_vec")]
    pub swell_components: Vec<Swell>,
    #[serde(default)]
    pub steepness: String,
    #[serde(with = "crate::serialize::nan")]
    pub average_period: f64,
    #[serde(default, with = "crate::serialize::tagged_option")]
    pub spectrum: Option<Spectrum>,
    #[serde(with = "crate::serialize::nan")]
    pub minimum_breaking_height: f64,
    #[serde(with = "crate::serialize::nan")]
    pub maximum_breaking_height: f64,

    // wind
    #[serde(with = "crate::serialize::nan")]
    pub wind_speed: f64,
    #[serde(with = "crate::serialize::nan")]
    pub wind_direction: f64,
    #[serde(default)]
    pub wind_compass_direction: String,
    #[serde(with = "crate::serialize::nan")]
    pub wind_gust: f64,

    // meteorology
    #[serde(with = "crate::serialize::nan")]
    pub pressure: f64,
    #[serde(with = "crate::serialize::nan")]
    pub pressure_tendency: f64,
    #[serde(with = "crate::serialize::nan")]
    pub air_temperature: f64,
    #[serde(with = "crate::serialize::nan")]
    pub water_temperature: f64,
    #[serde(with = "crate::serialize::nan")]
    pub dewpoint_temperature: f64,
    #[serde(with = "crate::serialize::nan")]
    pub visibility: f64,
    #[serde(with = "crate::serialize::nan")]
    pub water_level: f64,
    #[serde(default)]
    pub short_forecast: Option<String>,
}

impl Observation {
    /// An empty record with every measurement missing
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, unit: Units, provenance: Provenance) -> Self {
        Self {
            timestamp,
            unit,
            provenance,
            expiration_time: None,
            wave_summary: None,
            swell_components: Vec::new(),
            steepness: String::new(),
            average_period: f64::NAN,
            spectrum: None,
            minimum_breaking_height: f64::NAN,
            maximum_breaking_height: f64::NAN,
            wind_speed: f64::NAN,
            wind_direction: f64::NAN,
            wind_compass_direction: String::new(),
            wind_gust: f64::NAN,
            pressure: f64::NAN,
            pressure_tendency: f64::NAN,
            air_temperature: f64::NAN,
            water_temperature: f64::NAN,
            dewpoint_temperature: f64::NAN,
            visibility: f64::NAN,
            water_level: f64::NAN,
            short_forecast: None,
        }
    }

    #[must_use]
    pub fn is_forecast(&self) -> bool {
        self.provenance.is_forecast()
    }

    /// Whether the record is past its refresh boundary
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|expires| now >= expires)
    }

    /// Set wind direction in degrees and refresh the compass label
    pub fn set_wind_direction(&mut self, degrees: f64) {
        self.wind_direction = degrees;
        self.wind_compass_direction = if degrees.is_nan() {
            String::new()
        } else {
            units::degree_to_direction(degrees).to_string()
        };
    }

    /// Copy of this record with every measured field expressed in `unit`
    #[must_use]
    pub fn in_units(&self, unit: Units) -> Self {
        if unit == self.unit {
            return self.clone();
        }
        let from = self.unit;
        let length = |v| units::convert(v, Measurement::Length, from, unit);
        let speed = |v| units::convert(v, Measurement::Speed, from, unit);
        let temperature = |v| units::convert(v, Measurement::Temperature, from, unit);
        let pressure = |v| units::convert(v, Measurement::Pressure, from, unit);

        Self {
            unit,
            wave_summary: self.wave_summary.as_ref().map(|s| s.in_units(unit)),
            swell_components: self
                .swell_components
                .iter()
                .map(|s| s.in_units(unit))
                .collect(),
            minimum_breaking_height: length(self.minimum_breaking_height),
            maximum_breaking_height: length(self.maximum_breaking_height),
            wind_speed: speed(self.wind_speed),
            wind_gust: speed(self.wind_gust),
            pressure: pressure(self.pressure),
            pressure_tendency: pressure(self.pressure_tendency),
            air_temperature: temperature(self.air_temperature),
            water_temperature: temperature(self.water_temperature),
            dewpoint_temperature: temperature(self.dewpoint_temperature),
            water_level: length(self.water_level),
            ..self.clone()
        }
    }

    /// Take the summary direction from the component whose period is
    /// closest to the summary period
    pub fn interpolate_dominant_wave_direction(&mut self) {
        let Some(summary) = self.wave_summary.as_mut() else {
            return;
        };
        let closest = self.swell_components.iter().min_by(|a, b| {
            (a.period - summary.period)
                .abs()
                .total_cmp(&(b.period - summary.period).abs())
        });
        if let Some(component) = closest {
            summary.direction = component.direction;
            summary.compass_direction = component.compass_direction.clone();
        }
    }

    /// Take the summary period from the component whose height is closest
    /// to the summary height
    pub fn interpolate_dominant_wave_period(&mut self) {
        let Some(summary) = self.wave_summary.as_mut() else {
            return;
        };
        let closest = self.swell_components.iter().min_by(|a, b| {
            (a.wave_height - summary.wave_height)
                .abs()
                .total_cmp(&(b.wave_height - summary.wave_height).abs())
        });
        if let Some(component) = closest {
            summary.period = component.period;
        }
    }

    /// Solve breaking heights for every component and keep the largest range.
    ///
    /// Component order is left untouched.
    pub fn solve_breaking_wave_heights(&mut self, params: &BreakingParams) {
        let best = self
            .swell_components
            .iter()
            .filter_map(|swell| swell.breaking_wave_estimate(params))
            .max_by(|a, b| a.max.total_cmp(&b.max));

        match best {
            Some(range) => {
                self.minimum_breaking_height = range.min;
                self.maximum_breaking_height = range.max;
            }
            None => {
                self.minimum_breaking_height = f64::NAN;
                self.maximum_breaking_height = f64::NAN;
            }
        }
    }

    /// Copy wind speed and direction from another record
    pub fn copy_wind_data(&mut self, other: &Observation) {
        let other = other.in_units(self.unit);
        self.wind_speed = other.wind_speed;
        self.wind_direction = other.wind_direction;
        self.wind_compass_direction = other.wind_compass_direction;
    }
}

/// Fill wind, air temperature and short forecast on wave records from weather
/// records with the same timestamp. Both lists must be in ascending order.
#[must_use]
pub fn merge_wave_weather(waves: Vec<Observation>, weather: &[Observation]) -> Vec<Observation> {
    let Some(last) = weather.last() else {
        return waves;
    };
    let last_time = last.timestamp;
    let mut cursor = 0;
    let mut merged = 0;

    let waves = waves
        .into_iter()
        .map(|wave| {
            if wave.timestamp > last_time {
                return wave;
            }
            let Some(offset) = weather[cursor..]
                .iter()
                .position(|w| w.timestamp == wave.timestamp)
            else {
                return wave;
            };
            cursor += offset;
            merged += 1;

            let source = weather[cursor].in_units(wave.unit);
            let mut wave = wave;
            if !source.air_temperature.is_nan() {
                wave.air_temperature = source.air_temperature;
            }
            wave.short_forecast = source.short_forecast;
            if !source.wind_speed.is_nan() {
                wave.wind_speed = source.wind_speed;
            }
            if !source.wind_direction.is_nan() {
                wave.wind_direction = source.wind_direction;
                wave.wind_compass_direction = source.wind_compass_direction;
            }
            wave
        })
        .collect();

    debug!("Merged weather into {} wave records", merged);
    waves
}
