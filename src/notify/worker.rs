use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::notify::queue::NotificationJob;
use crate::state::AppState;

pub async fn run_notification_worker(
    state: Arc<AppState>,
    mut notification_rx: mpsc::Receiver<NotificationJob>,
) {
    info!("notification worker started");

    while let Some(job) = notification_rx.recv().await {
        state.metrics.notification_queue_depth.dec();

        let start = Instant::now();
        let notification = state
            .dispatcher
            .dispatch(job.kind, job.recipient.as_deref(), job.data)
            .await;

        let outcome = if notification.sent { "sent" } else { "failed" };
        state
            .metrics
            .notification_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
    }

    warn!("notification worker stopped: queue channel closed");
}
