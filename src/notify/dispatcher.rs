use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind};
use crate::notify::telegram::{DeliveryError, MessageSender};
use crate::notify::templates::{self, Destination};
use crate::observability::metrics::Metrics;
use crate::store::NotificationLog;

/// Formats and delivers notifications, and records every attempt.
///
/// Delivery is a single best-effort call per message. Failures are logged
/// and reflected in the recorded `sent` flag; nothing is retried and no
/// error reaches the caller.
pub struct Dispatcher {
    sender: Arc<dyn MessageSender>,
    channel_id: Option<String>,
    log: NotificationLog,
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        channel_id: Option<String>,
        log: NotificationLog,
        metrics: Metrics,
    ) -> Self {
        Self {
            sender,
            channel_id,
            log,
            metrics,
        }
    }

    pub fn log(&self) -> &NotificationLog {
        &self.log
    }

    pub async fn dispatch(
        &self,
        kind: NotificationKind,
        recipient: Option<&str>,
        data: Value,
    ) -> Notification {
        let recipient = recipient.map(str::trim).filter(|r| !r.is_empty());
        let now = Utc::now();
        let messages = templates::render(kind, recipient.is_some(), &data, now);

        let mut sent = !messages.is_empty();
        for message in &messages {
            let chat = match message.destination {
                Destination::Channel => self
                    .channel_id
                    .as_deref()
                    .ok_or(DeliveryError::MissingChat("channel")),
                Destination::Recipient => recipient.ok_or(DeliveryError::MissingChat("recipient")),
            };

            let outcome = match chat {
                Ok(chat_id) => self.sender.send_message(chat_id, &message.text).await,
                Err(err) => Err(err),
            };

            if let Err(err) = outcome {
                warn!(
                    notification_type = %kind,
                    destination = ?message.destination,
                    error = %err,
                    "notification delivery failed"
                );
                sent = false;
            }
        }

        let outcome = if sent { "sent" } else { "failed" };
        self.metrics
            .notifications_total
            .with_label_values(&[kind.as_str(), outcome])
            .inc();

        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            recipient: recipient.map(str::to_string),
            message: data.get("message").and_then(Value::as_str).map(str::to_string),
            text: messages
                .iter()
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            data,
            sent,
            created_at: now,
        };

        if let Err(err) = self.log.record(notification.clone()).await {
            error!(
                notification_id = %notification.id,
                error = %err,
                "failed to record notification"
            );
        }

        info!(
            notification_id = %notification.id,
            notification_type = %kind,
            sent,
            "notification dispatched"
        );

        notification
    }
}
