//! Swell component: one coherent wave train

use serde::{Deserialize, Serialize};

use crate::units::{self, Measurement, Units};
use crate::wave_physics::breaking_characteristics;

/// Empirical loss applied to the solved breaking height
const BREAKING_SCALE: f64 = 0.8;
/// Ratio between significant and rms breaking height
const RMS_RATIO: f64 = 1.4;
/// Heights at or above this are upstream sentinels, not waves
const MAX_PLAUSIBLE_HEIGHT: f64 = 1000.0;

/// Beach geometry used by the breaking-wave solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakingParams {
    /// Local water depth in meters
    pub depth: f64,
    /// Compass direction of the outward shore normal, degrees
    pub angle: f64,
    /// Beach slope (rise over run)
    pub slope: f64,
}

/// Breaking wave height range in the unit of the component it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakingRange {
    pub min: f64,
    pub max: f64,
}

/// A single swell component.
///
/// `direction` is the direction the waves come from, in degrees, unless the
/// record was flipped for forecast output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swell {
    pub unit: Units,
    #[serde(with = "crate::serialize::nan")]
    pub wave_height: f64,
    #[serde(with = "crate::serialize::nan")]
    pub period: f64,
    #[serde(with = "crate::serialize::nan")]
    pub direction: f64,
    pub compass_direction: String,
    #[serde(default)]
    pub max_energy: Option<f64>,
    #[serde(default)]
    pub frequency_index: Option<usize>,
}

impl Swell {
    /// Create a component, deriving the compass label from `direction`
    #[must_use]
    pub fn new(unit: Units, wave_height: f64, period: f64, direction: f64) -> Self {
        Self {
            unit,
            wave_height,
            period,
            direction,
            compass_direction: compass_label(direction),
            max_energy: None,
            frequency_index: None,
        }
    }

    /// A component with every measurement missing
    #[must_use]
    pub fn empty(unit: Units) -> Self {
        Self::new(unit, f64::NAN, f64::NAN, f64::NAN)
    }

    /// Set the direction from a compass label such as "NE"
    pub fn set_compass_direction(&mut self, label: &str) {
        match units::direction_to_degree(label) {
            Some(degrees) => self.set_direction(degrees),
            None => {
                self.direction = f64::NAN;
                self.compass_direction = String::new();
            }
        }
    }

    /// Set the direction in degrees and refresh the compass label
    pub fn set_direction(&mut self, degrees: f64) {
        self.direction = degrees;
        self.compass_direction = compass_label(degrees);
    }

    /// All of height, period and direction are known
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.wave_height.is_nan()
            && !self.period.is_nan()
            && !self.direction.is_nan()
            && !self.compass_direction.is_empty()
    }

    /// Copy of this component expressed in another unit system
    #[must_use]
    pub fn in_units(&self, unit: Units) -> Self {
        Self {
            unit,
            wave_height: units::convert(self.wave_height, Measurement::Length, self.unit, unit),
            ..self.clone()
        }
    }

    /// Copy of this component pointing the other way (from -> toward)
    #[must_use]
    pub fn flipped(&self) -> Self {
        let mut swell = self.clone();
        if self.direction.is_finite() {
            swell.set_direction((self.direction + 180.0).rem_euclid(360.0));
        }
        swell
    }

    /// Estimate the breaking wave height range of this component on a beach.
    ///
    /// Returns `None` for an invalid component. The range is expressed in
    /// this component's unit; the solve itself is metric.
    #[must_use]
    pub fn breaking_wave_estimate(&self, params: &BreakingParams) -> Option<BreakingRange> {
        if !self.is_valid() {
            return None;
        }

        let metric = self.in_units(Units::Metric);
        let mut breaking_height = 0.0;

        if metric.wave_height < MAX_PLAUSIBLE_HEIGHT {
            let incident = (metric.direction - params.angle).abs() % 360.0;
            if incident < 90.0 {
                breaking_height = breaking_characteristics(
                    metric.period,
                    incident,
                    metric.wave_height,
                    params.slope,
                    params.depth,
                )
                .wave_height;
            }
        }

        let max = BREAKING_SCALE * breaking_height;
        let min = max / RMS_RATIO;
        Some(BreakingRange {
            min: units::convert(min, Measurement::Length, Units::Metric, self.unit),
            max: units::convert(max, Measurement::Length, Units::Metric, self.unit),
        })
    }

    /// One-line human summary, e.g. "1.5 m @ 10.0 s 180° S"
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{:.1} {} @ {:.1} s {:.0}° {}",
            self.wave_height,
            units::unit_name(self.unit, Measurement::Length, true),
            self.period,
            self.direction,
            self.compass_direction
        )
    }
}

fn compass_label(degrees: f64) -> String {
    if degrees.is_nan() {
        String::new()
    } else {
        units::degree_to_direction(degrees).to_string()
    }
}

/// Sort components by peak energy, highest first. Components without an
/// energy keep their relative order behind those that have one.
pub fn sort_by_energy(components: &mut [Swell]) {
    components.sort_by(|a, b| {
        let a = a.max_energy.unwrap_or(f64::NEG_INFINITY);
        let b = b.max_energy.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
}
