use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    cache,
    config::{EndpointsConfig, SpotConfig},
    forecast::{SurfForecast, SurfForecastService},
    http::HttpClient,
    location::Location,
    ndbc::{Station, StationType},
};

const DEFAULT_STATION_COUNT: usize = 5;
const MAX_STATION_COUNT: usize = 50;

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: SurfForecastService,
    pub http: HttpClient,
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiSpot {
    pub name: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub swell_buoy_id: String,
    pub tide_station_id: String,
    pub timezone: String,
}

impl From<&SpotConfig> for ApiSpot {
    fn from(spot: &SpotConfig) -> Self {
        Self {
            name: spot.name.clone(),
            display_name: spot.display_name.clone(),
            latitude: spot.wind_location.lat,
            longitude: spot.wind_location.lon,
            swell_buoy_id: spot.swell_buoy_id.clone(),
            tide_station_id: spot.tide_station_id.clone(),
            timezone: spot.timezone.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiStation {
    pub station_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub station_type: StationType,
    pub owner: String,
    /// Great-circle distance from the query point in kilometers
    pub distance_km: f64,
}

impl ApiStation {
    fn new(station: &Station, from: &Location) -> Self {
        Self {
            station_id: station.station_id.clone(),
            name: station.name.clone(),
            latitude: station.location.latitude,
            longitude: station.location.longitude,
            station_type: station.station_type,
            owner: station.owner.clone(),
            distance_km: from.distance(&station.location, crate::units::Units::Metric),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: f64,
    pub lon: f64,
    pub count: Option<usize>,
    #[serde(rename = "type")]
    pub station_type: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/forecast/{spot}", get(get_forecast))
        .route("/spots", get(get_spots))
        .route("/stations/nearest", get(get_nearest_stations))
        .with_state(state)
}

async fn get_forecast(
    State(state): State<AppState>,
    Path(spot): Path<String>,
) -> Result<Json<SurfForecast>, StatusCode> {
    state
        .service
        .get_surf_forecast(&spot)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_spots(State(state): State<AppState>) -> Json<Vec<ApiSpot>> {
    Json(state.service.config().spots.iter().map(ApiSpot::from).collect())
}

async fn get_nearest_stations(
    State(state): State<AppState>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<Vec<ApiStation>>, StatusCode> {
    let location = Location::new(query.lat, query.lon);
    location.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let station_type = query
        .station_type
        .as_deref()
        .map(str::parse::<StationType>)
        .transpose()
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let count = query
        .count
        .unwrap_or(DEFAULT_STATION_COUNT)
        .min(MAX_STATION_COUNT);

    let catalog = cache::get_or_fetch_station_catalog(&state.http, &state.endpoints)
        .await
        .map_err(|e| {
            warn!("Station catalog unavailable: {}", e.user_message());
            StatusCode::BAD_GATEWAY
        })?;

    let stations = catalog
        .nearest_active_k(&location, count, station_type)
        .into_iter()
        .map(|station| ApiStation::new(station, &location))
        .collect();
    Ok(Json(stations))
}
