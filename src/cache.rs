//! Process-wide station catalog cache
//!
//! The catalog is fetched once on first use and shared as an `Arc` snapshot
//! until [`refresh_station_catalog`] replaces it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::Result;
use crate::config::EndpointsConfig;
use crate::http::HttpClient;
use crate::ndbc::StationCatalog;

static STATION_CATALOG: RwLock<Option<Arc<StationCatalog>>> = RwLock::const_new(None);

#[must_use]
pub fn catalog_url(endpoints: &EndpointsConfig) -> String {
    format!("{}/activestations.xml", endpoints.ndbc_base_url)
}

async fn fetch_station_catalog(
    http: &HttpClient,
    endpoints: &EndpointsConfig,
) -> Result<StationCatalog> {
    let fetched = http.fetch_text(&catalog_url(endpoints)).await?;
    let mut catalog = StationCatalog::parse_xml(&fetched.body)?;
    catalog.fetched_at = Some(Utc::now());
    Ok(catalog)
}

/// The cached catalog, fetching it on first use
#[tracing::instrument(name = "station_catalog", level = "debug", skip_all)]
pub async fn get_or_fetch_station_catalog(
    http: &HttpClient,
    endpoints: &EndpointsConfig,
) -> Result<Arc<StationCatalog>> {
    if let Some(catalog) = STATION_CATALOG.read().await.as_ref() {
        debug!("Station catalog cache hit");
        return Ok(Arc::clone(catalog));
    }

    let mut slot = STATION_CATALOG.write().await;
    // another caller may have filled it while we waited for the lock
    if let Some(catalog) = slot.as_ref() {
        debug!("Station catalog cache hit");
        return Ok(Arc::clone(catalog));
    }

    debug!("Station catalog cache miss");
    let catalog = Arc::new(fetch_station_catalog(http, endpoints).await?);
    info!("Cached station catalog with {} stations", catalog.len());
    *slot = Some(Arc::clone(&catalog));
    Ok(catalog)
}

/// Fetch the catalog again and replace the cached copy
pub async fn refresh_station_catalog(
    http: &HttpClient,
    endpoints: &EndpointsConfig,
) -> Result<Arc<StationCatalog>> {
    let catalog = Arc::new(fetch_station_catalog(http, endpoints).await?);
    info!("Refreshed station catalog with {} stations", catalog.len());
    *STATION_CATALOG.write().await = Some(Arc::clone(&catalog));
    Ok(catalog)
}

/// Install a pre-parsed catalog, skipping the network
pub async fn set_station_catalog(catalog: StationCatalog) -> Arc<StationCatalog> {
    let catalog = Arc::new(catalog);
    *STATION_CATALOG.write().await = Some(Arc::clone(&catalog));
    catalog
}

/// The cached catalog without fetching
pub async fn cached_station_catalog() -> Option<Arc<StationCatalog>> {
    STATION_CATALOG.read().await.clone()
}
