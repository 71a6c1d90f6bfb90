use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DriverRegistered,
    OrderCreated,
    OrderCompleted,
    DriverRating,
    SystemAlert,
    LocationUpdate,
    StatusChange,
    NewOrder,
    DriverAssigned,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DriverRegistered => "driver_registered",
            NotificationKind::OrderCreated => "order_created",
            NotificationKind::OrderCompleted => "order_completed",
            NotificationKind::DriverRating => "driver_rating",
            NotificationKind::SystemAlert => "system_alert",
            NotificationKind::LocationUpdate => "location_update",
            NotificationKind::StatusChange => "status_change",
            NotificationKind::NewOrder => "new_order",
            NotificationKind::DriverAssigned => "driver_assigned",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(raw.trim().to_string()))
            .map_err(|_| format!("unknown notification type '{}'", raw.trim()))
    }
}

/// Audit record of a single dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub text: String,
    #[serde(default)]
    pub data: Value,
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}
