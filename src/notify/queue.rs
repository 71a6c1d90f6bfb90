use serde_json::Value;

use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::state::AppState;

/// A notification handed off by a request handler for later delivery.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub kind: NotificationKind,
    pub recipient: Option<String>,
    pub data: Value,
}

impl NotificationJob {
    pub fn new(kind: NotificationKind, recipient: Option<String>, data: Value) -> Self {
        Self {
            kind,
            recipient,
            data,
        }
    }
}

/// Queues a job without waiting; a full or closed queue is reported back.
///
/// The depth gauge is raised before the send so the worker can never
/// lower it first.
pub fn enqueue_notification(state: &AppState, job: NotificationJob) -> Result<(), AppError> {
    state.metrics.notification_queue_depth.inc();

    if let Err(err) = state.notification_tx.try_send(job) {
        state.metrics.notification_queue_depth.dec();
        return Err(AppError::Internal(format!(
            "notification queue send failed: {err}"
        )));
    }

    Ok(())
}

/// Queues a job and only logs when that is impossible. The caller's own
/// work has already been committed at this point.
pub fn notify_later(state: &AppState, job: NotificationJob) {
    let kind = job.kind;
    if let Err(err) = enqueue_notification(state, job) {
        tracing::warn!(notification_type = %kind, error = %err, "notification dropped");
    }
}
