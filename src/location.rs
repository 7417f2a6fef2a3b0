//! Geographic location and great-circle distance

use haversine::{Location as HaversineLocation, Units as HaversineUnits, distance};
use serde::{Deserialize, Serialize};

use crate::units::{Units, earths_radius};
use crate::{Result, SwellcastError};

/// A point on the globe, optionally named and with altitude
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees, either [-180, 180] or [0, 360]
    pub longitude: f64,
    /// Altitude in meters
    #[serde(default = "crate::serialize::nan::missing", with = "crate::serialize::nan")]
    pub altitude: f64,
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
}

impl Location {
    /// Create a new unnamed location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: f64::NAN,
            name: None,
        }
    }

    /// Create a named location
    #[must_use]
    pub fn named(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(latitude, longitude)
        }
    }

    /// Check that the latitude is within the poles and both axes are finite
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || self.latitude.abs() > 90.0 {
            return Err(SwellcastError::config(format!(
                "Latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() {
            return Err(SwellcastError::config("Longitude must be finite"));
        }
        Ok(())
    }

    /// Longitude normalized to [0, 360), as used for model grid lookups
    #[must_use]
    pub fn absolute_longitude(&self) -> f64 {
        self.longitude.rem_euclid(360.0)
    }

    /// Longitude normalized to [-180, 180), as used for display and queries
    #[must_use]
    pub fn signed_longitude(&self) -> f64 {
        let lon = self.absolute_longitude();
        if lon >= 180.0 { lon - 360.0 } else { lon }
    }

    /// Great-circle distance to another location in the caller's unit
    /// (kilometers for metric, miles for english)
    #[must_use]
    pub fn distance(&self, other: &Location, unit: Units) -> f64 {
        let from = HaversineLocation {
            latitude: self.latitude,
            longitude: self.signed_longitude(),
        };
        let to = HaversineLocation {
            latitude: other.latitude,
            longitude: other.signed_longitude(),
        };
        let km = distance(from, to, HaversineUnits::Kilometers);
        km * earths_radius(unit) / earths_radius(Units::Metric)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.signed_longitude())
    }
}
