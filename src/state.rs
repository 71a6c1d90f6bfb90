use std::sync::Arc;

use tokio::sync::mpsc;

use crate::notify::{Dispatcher, MessageSender, NotificationJob};
use crate::observability::metrics::Metrics;
use crate::store::{DriverStore, OrderStore, Stores};
use crate::tracking::StreamSettings;

pub struct AppState {
    pub orders: OrderStore,
    pub drivers: DriverStore,
    pub dispatcher: Dispatcher,
    pub notification_tx: mpsc::Sender<NotificationJob>,
    pub streams: StreamSettings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        stores: Stores,
        sender: Arc<dyn MessageSender>,
        channel_id: Option<String>,
        streams: StreamSettings,
        notification_queue_size: usize,
    ) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (notification_tx, notification_rx) = mpsc::channel(notification_queue_size.max(1));
        let metrics = Metrics::new();

        let dispatcher = Dispatcher::new(
            sender,
            channel_id,
            stores.notifications,
            metrics.clone(),
        );

        (
            Self {
                orders: stores.orders,
                drivers: stores.drivers,
                dispatcher,
                notification_tx,
                streams,
                metrics,
            },
            notification_rx,
        )
    }
}
