use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind};
use crate::state::AppState;

const RECENT_LIMIT: usize = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/notifications", get(recent).post(send))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: Option<Value>,
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Serialize)]
pub struct SendNotificationResponse {
    pub sent: bool,
}

impl SendNotificationRequest {
    /// Chat ids arrive as either strings or numbers.
    fn recipient(&self) -> Option<String> {
        match &self.user_id {
            Some(Value::String(id)) => Some(id.trim().to_string()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Template data with the top-level `message` folded in when the data
    /// does not carry its own.
    fn template_data(self) -> Value {
        let mut data = match self.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(message) = self.message {
            data.entry("message").or_insert(Value::String(message));
        }
        Value::Object(data)
    }
}

async fn send(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendNotificationRequest>,
) -> Result<Json<SendNotificationResponse>, AppError> {
    let kind: NotificationKind = payload.kind.parse().map_err(AppError::BadRequest)?;
    let recipient = payload.recipient();

    let notification = state
        .dispatcher
        .dispatch(kind, recipient.as_deref(), payload.template_data())
        .await;

    Ok(Json(SendNotificationResponse {
        sent: notification.sent,
    }))
}

async fn recent(State(state): State<Arc<AppState>>) -> Json<Vec<Notification>> {
    Json(state.dispatcher.log().recent(RECENT_LIMIT).await)
}
