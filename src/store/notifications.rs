use tokio::sync::Mutex;
use tracing::info;

use crate::models::notification::Notification;
use crate::store::StoreError;
use crate::store::snapshot::Snapshot;

/// Records kept before the oldest ones are dropped.
pub const DEFAULT_RETENTION: usize = 1000;

/// Audit trail of dispatch attempts, in insertion order. Only the newest
/// `retention` records are kept, in memory and on disk.
pub struct NotificationLog {
    records: Mutex<Vec<Notification>>,
    retention: usize,
    snapshot: Snapshot,
}

impl NotificationLog {
    pub async fn open(snapshot: Snapshot) -> Result<Self, StoreError> {
        let mut records: Vec<Notification> = snapshot.load().await?;
        let excess = records.len().saturating_sub(DEFAULT_RETENTION);
        records.drain(..excess);
        info!(notifications = records.len(), "notification log loaded");

        Ok(Self {
            records: Mutex::new(records),
            retention: DEFAULT_RETENTION,
            snapshot,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            retention: DEFAULT_RETENTION,
            snapshot: Snapshot::in_memory(),
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub async fn record(&self, notification: Notification) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.push(notification);

        let excess = records.len().saturating_sub(self.retention);
        if let Err(err) = self.snapshot.save(&records[excess..]).await {
            records.pop();
            return Err(err);
        }
        records.drain(..excess);

        Ok(())
    }

    /// Up to `limit` records, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<Notification> {
        let records = self.records.lock().await;
        records.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}
