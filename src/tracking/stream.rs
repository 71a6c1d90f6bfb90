//! Live tracking subscriptions.
//!
//! Each subscription is one task that owns its timer and the sending half of
//! a bounded channel. It acknowledges the connection, then polls the order
//! store on a fixed interval and pushes the current snapshot. There is no
//! replay: a late subscriber only sees the state at its next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus, RoutePoint};
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    pub max_lifetime: Duration,
    pub buffer: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_lifetime: Duration::from_secs(300),
            buffer: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    Connected {
        tracking_number: String,
        timestamp: DateTime<Utc>,
    },
    PositionUpdate {
        tracking_number: String,
        timestamp: DateTime<Utc>,
        order_id: Uuid,
        status: OrderStatus,
        last_point: Option<RoutePoint>,
    },
}

impl StreamEvent {
    fn snapshot(order: &Order) -> Self {
        StreamEvent::PositionUpdate {
            tracking_number: order.tracking_number.clone(),
            timestamp: Utc::now(),
            order_id: order.id,
            status: order.status,
            last_point: order.last_point().cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    ClientDisconnected,
    SendFailed,
    LifetimeElapsed,
}

pub struct Subscription {
    pub events: mpsc::Receiver<StreamEvent>,
    pub task: JoinHandle<CloseReason>,
}

pub fn subscribe(state: Arc<AppState>, tracking_number: String) -> Subscription {
    let settings = state.streams;
    let (tx, events) = mpsc::channel(settings.buffer.max(1));

    let task = tokio::spawn(async move {
        state.metrics.active_streams.inc();
        let reason = run_subscription(&state, &tracking_number, &tx, settings).await;
        state.metrics.active_streams.dec();

        info!(tracking_number = %tracking_number, reason = ?reason, "tracking stream closed");
        reason
    });

    Subscription { events, task }
}

async fn run_subscription(
    state: &AppState,
    tracking_number: &str,
    tx: &mpsc::Sender<StreamEvent>,
    settings: StreamSettings,
) -> CloseReason {
    let mut phase = StreamPhase::Connecting;
    debug!(tracking_number, ?phase, "tracking stream starting");

    let connected = StreamEvent::Connected {
        tracking_number: tracking_number.to_string(),
        timestamp: Utc::now(),
    };
    if tx.try_send(connected).is_err() {
        return CloseReason::SendFailed;
    }

    phase = StreamPhase::Open;
    debug!(tracking_number, ?phase, "tracking stream open");

    let deadline = tokio::time::sleep(settings.max_lifetime);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(
        Instant::now() + settings.poll_interval,
        settings.poll_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            biased;

            _ = tx.closed() => break CloseReason::ClientDisconnected,
            _ = &mut deadline => break CloseReason::LifetimeElapsed,
            _ = ticker.tick() => {
                let Some(order) = state.orders.find(tracking_number) else {
                    continue;
                };

                match tx.try_send(StreamEvent::snapshot(&order)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!(tracking_number, "subscriber is lagging; snapshot skipped");
                    }
                    Err(TrySendError::Closed(_)) => break CloseReason::SendFailed,
                }
            }
        }
    };

    phase = StreamPhase::Closed;
    debug!(tracking_number, ?phase, "tracking stream finished");
    reason
}
