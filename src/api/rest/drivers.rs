use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::post;
use serde::Deserialize;

use crate::error::AppError;
use crate::lifecycle::drivers::{
    RateDriverRequest, RegisterDriverRequest, find_driver_by_phone, rate_driver, register_driver,
};
use crate::models::driver::{Driver, DriverSummary};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(register).get(list))
        .route("/drivers/search", post(search))
        .route("/drivers/:id/rating", post(rate))
}

#[derive(Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub phone: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<DriverSummary>, AppError> {
    Ok(Json(find_driver_by_phone(&state, &payload.phone)?))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    Ok(Json(register_driver(&state, payload).await?))
}

async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<DriverSummary>> {
    Json(state.drivers.list().iter().map(DriverSummary::from).collect())
}

async fn rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<RateDriverRequest>,
) -> Result<Json<DriverSummary>, AppError> {
    let driver = rate_driver(&state, id, payload).await?;
    Ok(Json(DriverSummary::from(&driver)))
}
