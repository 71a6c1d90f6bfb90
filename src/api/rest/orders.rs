use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::post;

use crate::error::AppError;
use crate::lifecycle::orders::{
    AssignRequest, BidRequest, CreateOrderRequest, assign_driver, complete_order, create_order,
    place_bid,
};
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create).get(list))
        .route("/orders/:id/bids", post(bid))
        .route("/orders/:id/assign", post(assign))
        .route("/orders/:id/complete", post(complete))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(create_order(&state, payload).await?))
}

async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(state.orders.list())
}

async fn bid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<BidRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(place_bid(&state, &id, payload).await?))
}

async fn assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(assign_driver(&state, &id, payload).await?))
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(complete_order(&state, &id).await?))
}
