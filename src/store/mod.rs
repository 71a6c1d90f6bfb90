pub mod drivers;
pub mod notifications;
pub mod orders;
pub mod snapshot;

use thiserror::Error;

pub use drivers::DriverStore;
pub use notifications::NotificationLog;
pub use orders::OrderStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),
}

/// The three persisted collections, opened together at startup.
pub struct Stores {
    pub orders: OrderStore,
    pub drivers: DriverStore,
    pub notifications: NotificationLog,
}

impl Stores {
    pub async fn open(data_dir: &std::path::Path) -> Result<Self, StoreError> {
        Ok(Self {
            orders: OrderStore::open(snapshot::Snapshot::at(data_dir.join("orders.json"))).await?,
            drivers: DriverStore::open(snapshot::Snapshot::at(data_dir.join("drivers.json")))
                .await?,
            notifications: NotificationLog::open(snapshot::Snapshot::at(
                data_dir.join("notifications.json"),
            ))
            .await?,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            orders: OrderStore::in_memory(),
            drivers: DriverStore::in_memory(),
            notifications: NotificationLog::in_memory(),
        }
    }
}
