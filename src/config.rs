//! Configuration management for swellcast
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::SwellcastError;
use crate::location::Location;
use crate::observation::ExpirationPolicy;
use crate::swell::BreakingParams;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwellcastConfig {
    /// Upstream request settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Upstream base URLs
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Buoy refresh minutes used to stamp `expiration_time`
    #[serde(default)]
    pub expiration: ExpirationPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Surf spots served by the forecast endpoint
    #[serde(default = "default_spots")]
    pub spots: Vec<SpotConfig>,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Retries on 5xx and connection errors
    #[serde(default = "default_http_max_retries")]
    pub max_retries: u32,
    /// api.weather.gov rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Base URLs of the upstream services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_ndbc_base_url")]
    pub ndbc_base_url: String,
    #[serde(default = "default_nomads_base_url")]
    pub nomads_base_url: String,
    #[serde(default = "default_tides_base_url")]
    pub tides_base_url: String,
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// A latitude/longitude pair as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One surf spot and the stations that feed its forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotConfig {
    /// Slug used in URLs, e.g. `steamer_lane`
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub swell_buoy_id: String,
    pub met_buoy_id: String,
    pub tide_station_id: String,
    pub wind_location: Coordinates,
    pub breaking: BreakingParams,
    /// IANA zone the forecast timestamps are rendered in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl SpotConfig {
    #[must_use]
    pub fn wind_location(&self) -> Location {
        Location::named(
            self.wind_location.lat,
            self.wind_location.lon,
            self.display_name.clone(),
        )
    }

    /// The configured zone, or UTC when it does not parse
    #[must_use]
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

// Default value functions
fn default_http_timeout() -> u32 {
    10
}

fn default_http_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    format!("swellcast/{}", crate::VERSION)
}

fn default_ndbc_base_url() -> String {
    "https://www.ndbc.noaa.gov".to_string()
}

fn default_nomads_base_url() -> String {
    "https://nomads.ncep.noaa.gov".to_string()
}

fn default_tides_base_url() -> String {
    "https://api.tidesandcurrents.noaa.gov".to_string()
}

fn default_weather_base_url() -> String {
    "https://api.weather.gov".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

#[allow(clippy::too_many_arguments)]
fn spot(
    name: &str,
    display_name: &str,
    swell_buoy_id: &str,
    met_buoy_id: &str,
    tide_station_id: &str,
    wind_location: (f64, f64),
    breaking: (f64, f64, f64),
    timezone: &str,
) -> SpotConfig {
    SpotConfig {
        name: name.to_string(),
        display_name: display_name.to_string(),
        swell_buoy_id: swell_buoy_id.to_string(),
        met_buoy_id: met_buoy_id.to_string(),
        tide_station_id: tide_station_id.to_string(),
        wind_location: Coordinates {
            lat: wind_location.0,
            lon: wind_location.1,
        },
        breaking: BreakingParams {
            depth: breaking.0,
            angle: breaking.1,
            slope: breaking.2,
        },
        timezone: timezone.to_string(),
    }
}

fn default_spots() -> Vec<SpotConfig> {
    const EASTERN: &str = "America/New_York";
    const PACIFIC: &str = "America/Los_Angeles";
    vec![
        spot("narragansett", "Narragansett", "44097", "44097", "8452660", (41.41, -71.45), (30.0, 145.0, 0.02), EASTERN),
        spot("lido", "Lido Beach", "44065", "44009", "8516402", (40.5898, -73.5768), (25.0, 170.0, 0.02), EASTERN),
        spot("manasquan", "Manasquan", "44091", "44009", "8533051", (40.1023, -74.0334), (25.0, 110.0, 0.02), EASTERN),
        spot("rockaways", "Rockaways", "44065", "44009", "8516881", (40.5832, -73.8157), (25.0, 165.0, 0.02), EASTERN),
        spot("belmar", "Belmar", "44091", "44009", "8533051", (40.1762, -74.0121), (25.0, 105.0, 0.02), EASTERN),
        spot("steamer_lane", "Steamer Lane", "46042", "46042", "9413450", (36.9513, -122.0262), (20.0, 200.0, 0.03), PACIFIC),
        spot("trestles", "Trestles", "46277", "46277", "9410230", (33.3825, -117.5889), (20.0, 220.0, 0.025), PACIFIC),
    ]
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            max_retries: default_http_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            ndbc_base_url: default_ndbc_base_url(),
            nomads_base_url: default_nomads_base_url(),
            tides_base_url: default_tides_base_url(),
            weather_base_url: default_weather_base_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

impl Default for SwellcastConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            endpoints: EndpointsConfig::default(),
            expiration: ExpirationPolicy::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            spots: default_spots(),
        }
    }
}

impl SwellcastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SWELLCAST_HTTP__TIMEOUT_SECONDS=20
        builder = builder.add_source(
            Environment::with_prefix("SWELLCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SwellcastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("swellcast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_http_timeout();
        }
        if self.http.user_agent.is_empty() {
            self.http.user_agent = default_user_agent();
        }
        if self.endpoints.ndbc_base_url.is_empty() {
            self.endpoints.ndbc_base_url = default_ndbc_base_url();
        }
        if self.endpoints.nomads_base_url.is_empty() {
            self.endpoints.nomads_base_url = default_nomads_base_url();
        }
        if self.endpoints.tides_base_url.is_empty() {
            self.endpoints.tides_base_url = default_tides_base_url();
        }
        if self.endpoints.weather_base_url.is_empty() {
            self.endpoints.weather_base_url = default_weather_base_url();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.port == 0 {
            self.server.port = default_server_port();
        }
        for spot in &mut self.spots {
            if spot.display_name.is_empty() {
                spot.display_name = spot.name.clone();
            }
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_spots()?;
        Ok(())
    }

    /// Look up a spot by slug, ignoring case
    #[must_use]
    pub fn find_spot(&self, name: &str) -> Option<&SpotConfig> {
        self.spots.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 60 {
            return Err(SwellcastError::config("HTTP timeout cannot exceed 60 seconds").into());
        }

        if self.http.max_retries > 10 {
            return Err(SwellcastError::config("HTTP max retries cannot exceed 10").into());
        }

        let ExpirationPolicy {
            first_refresh_minute,
            second_refresh_minute,
        } = self.expiration;
        if first_refresh_minute < 2
            || first_refresh_minute >= second_refresh_minute
            || second_refresh_minute > 59
        {
            return Err(SwellcastError::config(
                "Expiration minutes must satisfy 2 <= first < second <= 59",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SwellcastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SwellcastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("ndbc", &self.endpoints.ndbc_base_url),
            ("nomads", &self.endpoints.nomads_base_url),
            ("tides", &self.endpoints.tides_base_url),
            ("weather", &self.endpoints.weather_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SwellcastError::config(format!(
                    "The {name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn validate_spots(&self) -> Result<()> {
        for spot in &self.spots {
            let context = || format!("Invalid spot '{}'", spot.name);

            if spot.name.is_empty() {
                return Err(SwellcastError::config("Spot name cannot be empty").into());
            }
            if spot.timezone.parse::<chrono_tz::Tz>().is_err() {
                return Err(SwellcastError::config(format!(
                    "Unknown timezone '{}'",
                    spot.timezone
                )))
                .with_context(context);
            }
            Location::new(spot.wind_location.lat, spot.wind_location.lon)
                .validate()
                .with_context(context)?;
            if !(spot.breaking.depth > 0.0) {
                return Err(SwellcastError::config("Breaking depth must be positive"))
                    .with_context(context);
            }
            if !(spot.breaking.slope > 0.0 && spot.breaking.slope < 1.0) {
                return Err(SwellcastError::config("Beach slope must be between 0 and 1"))
                    .with_context(context);
            }
        }
        Ok(())
    }
}
