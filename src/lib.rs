//! `Swellcast` - surf forecasts from buoys, tides and wave models
//!
//! This library parses NOAA buoy, tide, weather and wave-model feeds,
//! decomposes wave spectra into swell components and fuses everything into
//! an hourly per-spot surf forecast.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod http;
pub mod location;
pub mod logging;
pub mod model;
pub mod ndbc;
pub mod observation;
pub mod serialize;
pub mod spectrum;
pub mod swell;
pub mod tide;
pub mod units;
pub mod wave_physics;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::{SpotConfig, SwellcastConfig};
pub use error::SwellcastError;
pub use forecast::{ForecastSources, NoaaSources, SurfForecast, SurfForecastService};
pub use location::Location;
pub use ndbc::{BulletinParser, BuoyParser, Station, StationCatalog, StationType};
pub use observation::{Observation, Provenance};
pub use spectrum::Spectrum;
pub use swell::{BreakingParams, Swell};
pub use units::Units;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SwellcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
