use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use swellcast::api::AppState;
use swellcast::{NoaaSources, SurfForecastService, SwellcastConfig, logging, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(SwellcastConfig::load().context("Failed to load configuration")?);
    logging::init(&config.logging)?;
    info!(
        "Starting swellcast {} with {} spots",
        swellcast::VERSION,
        config.spots.len()
    );

    let sources = NoaaSources::from_config(&config).context("Failed to build HTTP client")?;
    let state = AppState {
        http: sources.http().clone(),
        endpoints: config.endpoints.clone(),
        service: SurfForecastService::new(Arc::clone(&config), Arc::new(sources)),
    };

    web::run(config.server.port, state).await
}
