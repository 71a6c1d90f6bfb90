use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::Stream;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AppError;
use crate::models::order::{Order, RoutePoint};
use crate::state::AppState;
use crate::tracking::{TrackingUpdate, apply_tracking_update, subscribe};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/tracking/:tracking_number",
            get(get_tracking).put(update_tracking),
        )
        .route("/tracking/:tracking_number/stream", get(stream_tracking))
}

async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.get(&tracking_number)?;
    Ok(Json(order))
}

async fn update_tracking(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
    Json(payload): Json<TrackingUpdate>,
) -> Result<Json<RoutePoint>, AppError> {
    let point = apply_tracking_update(&state, &tracking_number, payload).await?;
    Ok(Json(point))
}

async fn stream_tracking(
    State(state): State<Arc<AppState>>,
    Path(tracking_number): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = subscribe(state, tracking_number);

    let events = ReceiverStream::new(subscription.events)
        .map(|event| Event::default().json_data(event));

    Sse::new(events).keep_alive(KeepAlive::default())
}
