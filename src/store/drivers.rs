use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::driver::Driver;
use crate::phone;
use crate::store::StoreError;
use crate::store::snapshot::Snapshot;

/// The driver directory, keyed by numeric id.
pub struct DriverStore {
    drivers: DashMap<u64, Driver>,
    write_gate: Mutex<()>,
    snapshot: Snapshot,
}

impl DriverStore {
    pub async fn open(snapshot: Snapshot) -> Result<Self, StoreError> {
        let records: Vec<Driver> = snapshot.load().await?;
        let drivers = DashMap::new();
        for driver in records {
            drivers.insert(driver.id, driver);
        }

        info!(drivers = drivers.len(), "driver store loaded");

        Ok(Self {
            drivers,
            write_gate: Mutex::new(()),
            snapshot,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            drivers: DashMap::new(),
            write_gate: Mutex::new(()),
            snapshot: Snapshot::in_memory(),
        }
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn get(&self, id: u64) -> Result<Driver, StoreError> {
        self.drivers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("driver {id} not found")))
    }

    /// All drivers in storage order (ascending id).
    pub fn list(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by_key(|driver| driver.id);
        drivers
    }

    /// First driver in storage order whose phone or one of its variants
    /// normalizes to the same number as `raw_phone`. Stored forms are
    /// normalized on the fly, so imported records keep whatever prefix they
    /// arrived with.
    pub fn find_by_phone(&self, raw_phone: &str) -> Option<Driver> {
        let candidate = phone::normalize(raw_phone);
        let candidate_digits = phone::digits_only(&candidate);

        self.list().into_iter().find(|driver| {
            phone::normalize(&driver.phone) == candidate
                || driver
                    .phone_variants
                    .iter()
                    .any(|variant| phone::normalize(variant) == candidate)
                || phone::digits_only(&driver.phone) == candidate_digits
        })
    }

    /// Inserts a new driver under the next free id.
    pub async fn register(&self, mut driver: Driver) -> Result<Driver, StoreError> {
        let _gate = self.write_gate.lock().await;

        if let Some(existing) = self.find_by_phone(&driver.phone) {
            return Err(StoreError::Conflict(format!(
                "phone {} is already registered to driver {}",
                driver.phone, existing.id
            )));
        }

        driver.id = self
            .drivers
            .iter()
            .map(|entry| *entry.key())
            .max()
            .unwrap_or(0)
            + 1;

        self.commit(driver).await
    }

    pub async fn update<F>(&self, id: u64, change: F) -> Result<Driver, StoreError>
    where
        F: FnOnce(&mut Driver) -> Result<(), StoreError>,
    {
        let _gate = self.write_gate.lock().await;

        let mut driver = self.get(id)?;
        change(&mut driver)?;

        self.commit(driver).await
    }

    async fn commit(&self, driver: Driver) -> Result<Driver, StoreError> {
        let mut all: Vec<Driver> = self
            .drivers
            .iter()
            .filter(|entry| *entry.key() != driver.id)
            .map(|entry| entry.value().clone())
            .collect();
        all.push(driver.clone());
        all.sort_by_key(|d| d.id);

        self.snapshot.save(&all).await?;
        self.drivers.insert(driver.id, driver.clone());

        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::DriverStore;
    use crate::models::driver::{Driver, DriverStatus, VehicleType};
    use crate::store::StoreError;

    fn driver(name: &str, phone: &str, variants: &[&str]) -> Driver {
        Driver {
            id: 0,
            name: name.to_string(),
            phone: phone.to_string(),
            phone_variants: variants.iter().map(|v| v.to_string()).collect(),
            vehicle_plate: "777AAA02".to_string(),
            vehicle_type: VehicleType::Refrigerator,
            rating: 5.0,
            rating_count: 0,
            status: DriverStatus::Active,
            location: "Алматы".to_string(),
            telegram_chat_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn register_assigns_sequential_ids() {
        let store = DriverStore::in_memory();
        let first = store.register(driver("A", "+77010000001", &[])).await.unwrap();
        let second = store.register(driver("B", "+77010000002", &[])).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn both_dual_prefix_forms_find_the_same_driver() {
        let store = DriverStore::in_memory();
        store.register(driver("Ерлан", "+77001234567", &[])).await.unwrap();

        let by_eight = store.find_by_phone("8 700 123 45 67").unwrap();
        let by_seven = store.find_by_phone("7 700 123 45 67").unwrap();

        assert_eq!(by_eight.id, by_seven.id);
        assert_eq!(by_eight.name, "Ерлан");
    }

    #[tokio::test]
    async fn raw_stored_phone_is_found_by_either_prefix() {
        let store = DriverStore::in_memory();
        store.register(driver("Ерлан", "87001234567", &[])).await.unwrap();

        for query in ["87001234567", "77001234567", "+7 700 123 45 67"] {
            let found = store.find_by_phone(query).unwrap();
            assert_eq!(found.name, "Ерлан", "query {query}");
        }
    }

    #[tokio::test]
    async fn raw_stored_variant_is_found_by_either_prefix() {
        let store = DriverStore::in_memory();
        store
            .register(driver("Марат", "+77055550000", &["77771234567"]))
            .await
            .unwrap();

        assert_eq!(store.find_by_phone("87771234567").unwrap().name, "Марат");
        assert_eq!(store.find_by_phone("77771234567").unwrap().name, "Марат");
    }

    #[tokio::test]
    async fn variants_are_searched() {
        let store = DriverStore::in_memory();
        store
            .register(driver("Марат", "+77055550000", &["+77770001122"]))
            .await
            .unwrap();

        let found = store.find_by_phone("+7 777 000 11 22").unwrap();
        assert_eq!(found.name, "Марат");
    }

    #[tokio::test]
    async fn unknown_phone_finds_nobody() {
        let store = DriverStore::in_memory();
        store.register(driver("A", "+77010000001", &[])).await.unwrap();

        assert!(store.find_by_phone("+77019999999").is_none());
    }

    #[tokio::test]
    async fn lowest_id_wins_among_several_matches() {
        let store = DriverStore::in_memory();
        store
            .register(driver("First", "+77010000001", &["+77020000000"]))
            .await
            .unwrap();
        store
            .register(driver("Second", "+77020000000", &[]))
            .await
            .unwrap_err();
        store
            .register(driver("Third", "+77030000000", &["+77020000000"]))
            .await
            .unwrap();

        assert_eq!(store.find_by_phone("87020000000").unwrap().name, "First");
    }

    #[tokio::test]
    async fn duplicate_phone_is_a_conflict() {
        let store = DriverStore::in_memory();
        store.register(driver("A", "+77010000001", &[])).await.unwrap();

        let result = store.register(driver("B", "8 701 000 00 01", &[])).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }
}
