//! Upstream data needed by a surf forecast
//!
//! [`ForecastSources`] is the seam between the fusion engine and the network.
//! [`NoaaSources`] talks to the real services; tests substitute fixtures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::config::{EndpointsConfig, SwellcastConfig};
use crate::http::HttpClient;
use crate::location::Location;
use crate::ndbc::stations::{bulletin_url, realtime_url};
use crate::ndbc::{BulletinParser, BuoyParser};
use crate::observation::{ExpirationPolicy, Observation};
use crate::tide::{TideDatum, TideInterval, TidePrediction, TideStation, parse_predictions};
use crate::units::Units;
use crate::{Result, weather};

#[async_trait]
pub trait ForecastSources: Send + Sync {
    /// Observed wave records from a buoy, ascending
    async fn wave_observations(&self, buoy_id: &str, now: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Observed wind records from a buoy, ascending
    async fn wind_observations(&self, buoy_id: &str, now: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Hourly tide predictions between two instants, ascending
    async fn tide_predictions(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TidePrediction>>;

    /// Wave model point bulletin for one model run, ascending
    async fn wave_bulletin(&self, buoy_id: &str, model_run: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Hourly weather forecast at a location, ascending
    async fn hourly_weather(&self, location: &Location) -> Result<Vec<Observation>>;
}

/// Live NOAA services: NDBC, NOMADS, CO-OPS and api.weather.gov
#[derive(Debug, Clone)]
pub struct NoaaSources {
    http: HttpClient,
    endpoints: EndpointsConfig,
    expiration: ExpirationPolicy,
}

impl NoaaSources {
    #[must_use]
    pub fn new(http: HttpClient, endpoints: EndpointsConfig, expiration: ExpirationPolicy) -> Self {
        Self {
            http,
            endpoints,
            expiration,
        }
    }

    pub fn from_config(config: &SwellcastConfig) -> Result<Self> {
        Ok(Self::new(
            HttpClient::new(&config.http)?,
            config.endpoints.clone(),
            config.expiration,
        ))
    }

    #[must_use]
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    #[must_use]
    pub fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }

    async fn spectral_observations(&self, parser: BuoyParser, buoy_id: &str) -> Result<Vec<Observation>> {
        let energy_url = realtime_url(&self.endpoints, buoy_id, "data_spec");
        let directional_url = realtime_url(&self.endpoints, buoy_id, "swdir");
        let (energy, directional) = tokio::try_join!(
            self.http.fetch_text(&energy_url),
            self.http.fetch_text(&directional_url),
        )?;
        parser.parse_spectra(&energy.body, &directional.body, energy.last_modified)
    }
}

#[async_trait]
impl ForecastSources for NoaaSources {
    /// Spectral records when the buoy publishes spectra, the detailed wave
    /// summary otherwise
    #[instrument(skip(self))]
    async fn wave_observations(&self, buoy_id: &str, now: DateTime<Utc>) -> Result<Vec<Observation>> {
        let parser = BuoyParser::expiring(&self.expiration, now);
        match self.spectral_observations(parser, buoy_id).await {
            Ok(records) if !records.is_empty() => return Ok(records),
            Ok(_) => warn!("No spectral records for {}, using detailed wave feed", buoy_id),
            Err(e) => warn!("Spectra unavailable for {}: {}, using detailed wave feed", buoy_id, e),
        }

        let raw = self.http.fetch_text(&realtime_url(&self.endpoints, buoy_id, "spec")).await?;
        parser.parse_detailed_wave(&raw.body)
    }

    #[instrument(skip(self))]
    async fn wind_observations(&self, buoy_id: &str, now: DateTime<Utc>) -> Result<Vec<Observation>> {
        let raw = self.http.fetch_text(&realtime_url(&self.endpoints, buoy_id, "txt")).await?;
        BuoyParser::expiring(&self.expiration, now).parse_realtime_met(&raw.body)
    }

    #[instrument(skip(self))]
    async fn tide_predictions(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TidePrediction>> {
        let datum = TideDatum::MeanLowerLowWater;
        let url = TideStation::new(station_id).data_url(
            &self.endpoints,
            start,
            end,
            datum,
            TideInterval::Hourly,
            Units::English,
        );
        let raw = self.http.fetch_text(&url).await?;
        Ok(parse_predictions(&raw.body, datum, Units::English)?.predictions)
    }

    #[instrument(skip(self))]
    async fn wave_bulletin(&self, buoy_id: &str, model_run: DateTime<Utc>) -> Result<Vec<Observation>> {
        let raw = self
            .http
            .fetch_text(&bulletin_url(&self.endpoints, buoy_id, model_run))
            .await?;
        BulletinParser::parse(&raw.body)
    }

    #[instrument(skip(self), fields(location = %location.format_coordinates()))]
    async fn hourly_weather(&self, location: &Location) -> Result<Vec<Observation>> {
        let points = self
            .http
            .fetch_text(&weather::points_url(&self.endpoints, location))
            .await?;
        let grid = weather::parse_points(&points.body)?;
        let hourly = self
            .http
            .fetch_text(&weather::hourly_forecast_url(&self.endpoints, &grid))
            .await?;
        weather::parse_hourly_forecast(&hourly.body)
    }
}
