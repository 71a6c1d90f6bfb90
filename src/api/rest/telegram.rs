use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::routing::post;
use serde_json::{Value, json};
use tracing::info;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/telegram/webhook", post(webhook))
}

/// Bot updates are acknowledged and logged; conversations are handled elsewhere.
async fn webhook(Json(update): Json<Value>) -> Json<Value> {
    let update_id = update.get("update_id").and_then(Value::as_i64);
    let chat_id = update
        .pointer("/message/chat/id")
        .and_then(Value::as_i64);

    info!(?update_id, ?chat_id, "telegram update received");
    Json(json!({ "ok": true }))
}
