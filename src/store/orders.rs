use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::models::order::{NewRoutePoint, Order, RoutePoint};
use crate::store::StoreError;
use crate::store::snapshot::Snapshot;

/// Map key for a tracking number: surrounding whitespace dropped, uppercased.
pub fn tracking_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Orders keyed by tracking number.
///
/// Reads go straight to the map. Writes are serialized by `write_gate`: the
/// changed order is built on a copy, the whole collection including that
/// copy is flushed, and only then is the copy published. A failed flush
/// leaves the in-memory state untouched.
pub struct OrderStore {
    orders: DashMap<String, Order>,
    write_gate: Mutex<()>,
    snapshot: Snapshot,
}

impl OrderStore {
    pub async fn open(snapshot: Snapshot) -> Result<Self, StoreError> {
        let records: Vec<Order> = snapshot.load().await?;
        let orders = DashMap::new();
        for order in records {
            orders.insert(tracking_key(&order.tracking_number), order);
        }

        info!(orders = orders.len(), "order store loaded");

        Ok(Self {
            orders,
            write_gate: Mutex::new(()),
            snapshot,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            orders: DashMap::new(),
            write_gate: Mutex::new(()),
            snapshot: Snapshot::in_memory(),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, tracking_number: &str) -> bool {
        self.orders.contains_key(&tracking_key(tracking_number))
    }

    /// Looks an order up by tracking number (any letter case), falling back
    /// to its id.
    pub fn find(&self, key: &str) -> Option<Order> {
        let key = key.trim();
        if let Some(order) = self.orders.get(&tracking_key(key)) {
            return Some(order.value().clone());
        }

        let id = Uuid::parse_str(key).ok()?;
        self.orders
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
    }

    pub fn get(&self, key: &str) -> Result<Order, StoreError> {
        self.find(key)
            .ok_or_else(|| StoreError::NotFound(format!("order {} not found", key.trim())))
    }

    /// All orders, oldest first.
    pub fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        orders
    }

    pub async fn create(&self, order: Order) -> Result<Order, StoreError> {
        let _gate = self.write_gate.lock().await;

        if self.orders.contains_key(&tracking_key(&order.tracking_number)) {
            return Err(StoreError::Conflict(format!(
                "tracking number {} already exists",
                order.tracking_number
            )));
        }

        self.commit(order).await
    }

    /// Appends one waypoint stamped with the current time. A given status
    /// becomes the order's current status; without one the point inherits
    /// it. `driver_id` is recorded only if the order has no driver yet.
    pub async fn append_route_point(
        &self,
        key: &str,
        draft: NewRoutePoint,
        driver_id: Option<u64>,
    ) -> Result<Order, StoreError> {
        self.update(key, |order| {
            let point = RoutePoint {
                lat: draft.lat,
                lng: draft.lng,
                location: draft.location,
                status: draft.status.unwrap_or(order.status),
                description: draft.description,
                timestamp: Utc::now(),
            };
            order.push_point(point, draft.status);

            if order.driver_id.is_none() {
                order.driver_id = driver_id;
            }
            Ok(())
        })
        .await
    }

    /// Applies `change` to a copy of the order and persists it atomically
    /// with respect to every other writer of this store.
    pub async fn update<F>(&self, key: &str, change: F) -> Result<Order, StoreError>
    where
        F: FnOnce(&mut Order) -> Result<(), StoreError>,
    {
        let _gate = self.write_gate.lock().await;

        let mut order = self.get(key)?;
        change(&mut order)?;

        self.commit(order).await
    }

    async fn commit(&self, order: Order) -> Result<Order, StoreError> {
        let key = tracking_key(&order.tracking_number);
        let mut all: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.key() != &key)
            .map(|entry| entry.value().clone())
            .collect();
        all.push(order.clone());
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        self.snapshot.save(&all).await?;
        self.orders.insert(key, order.clone());

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::OrderStore;
    use crate::models::driver::VehicleType;
    use crate::models::order::{Cargo, NewRoutePoint, Order, OrderStatus};
    use crate::store::StoreError;
    use crate::store::snapshot::Snapshot;

    fn order(tracking_number: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            tracking_number: tracking_number.to_string(),
            client_name: "Айгуль".to_string(),
            client_phone: "+77011112233".to_string(),
            client_email: None,
            client_chat_id: None,
            origin: "Алматы".to_string(),
            destination: "Урумчи".to_string(),
            description: "Текстиль".to_string(),
            cargo: Cargo {
                weight_kg: 1200.0,
                volume_m3: 8.0,
                car_type: VehicleType::Tent,
            },
            status: OrderStatus::Created,
            driver_id: None,
            price: None,
            bids: Vec::new(),
            route: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn point(label: &str, status: Option<OrderStatus>) -> NewRoutePoint {
        NewRoutePoint {
            lat: 43.8,
            lng: 87.6,
            location: label.to_string(),
            status,
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn get_resolves_tracking_number_and_id() {
        let store = OrderStore::in_memory();
        let created = store.create(order("WT000001")).await.unwrap();

        assert_eq!(store.get("WT000001").unwrap().id, created.id);
        assert_eq!(
            store.get(&created.id.to_string()).unwrap().tracking_number,
            "WT000001"
        );
        assert!(matches!(store.get("WT999999"), Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_tracking_number_is_a_conflict() {
        let store = OrderStore::in_memory();
        store.create(order("WT000002")).await.unwrap();

        let result = store.create(order("WT000002")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn append_without_status_keeps_previous_status() {
        let store = OrderStore::in_memory();
        store.create(order("WT000003")).await.unwrap();

        store
            .append_route_point(
                "WT000003",
                point("Хоргос", Some(OrderStatus::InTransit)),
                None,
            )
            .await
            .unwrap();
        let updated = store
            .append_route_point("WT000003", point("Урумчи", None), None)
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::InTransit);
        assert_eq!(updated.route.len(), 2);
        assert_eq!(updated.route[1].status, OrderStatus::InTransit);
    }

    #[tokio::test]
    async fn append_records_driver_only_when_unassigned() {
        let store = OrderStore::in_memory();
        store.create(order("WT000007")).await.unwrap();

        let first = store
            .append_route_point("WT000007", point("Хоргос", None), Some(3))
            .await
            .unwrap();
        assert_eq!(first.driver_id, Some(3));
        assert_eq!(first.route[0].status, OrderStatus::Created);

        let second = store
            .append_route_point("WT000007", point("Урумчи", None), Some(9))
            .await
            .unwrap();
        assert_eq!(second.driver_id, Some(3));
    }

    #[tokio::test]
    async fn lookup_ignores_tracking_number_case() {
        let store = OrderStore::in_memory();
        store.create(order("WT000008")).await.unwrap();

        assert_eq!(store.get("wt000008").unwrap().tracking_number, "WT000008");
        assert_eq!(store.get(" Wt000008 ").unwrap().tracking_number, "WT000008");
        assert!(store.contains("wt000008"));

        let updated = store
            .append_route_point("wt000008", point("Хоргос", None), None)
            .await
            .unwrap();
        assert_eq!(updated.route.len(), 1);
        assert_eq!(store.len(), 1);

        let result = store.create(order("wt000008")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let store = Arc::new(OrderStore::in_memory());
        store.create(order("WT000004")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let point = point(&format!("p{i}"), Some(OrderStatus::InTransit));
                store.append_route_point("WT000004", point, None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get("WT000004").unwrap().route.len(), 32);
    }

    #[tokio::test]
    async fn appended_points_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");

        let store = OrderStore::open(Snapshot::at(&path)).await.unwrap();
        store.create(order("WT000005")).await.unwrap();
        store
            .append_route_point(
                "WT000005",
                point("Хоргос", Some(OrderStatus::Warehouse)),
                None,
            )
            .await
            .unwrap();
        drop(store);

        let reopened = OrderStore::open(Snapshot::at(&path)).await.unwrap();
        let order = reopened.get("WT000005").unwrap();
        assert_eq!(order.route.len(), 1);
        assert_eq!(order.route[0].location, "Хоргос");
        assert_eq!(order.status, OrderStatus::Warehouse);
    }

    #[tokio::test]
    async fn failed_change_leaves_order_untouched() {
        let store = OrderStore::in_memory();
        store.create(order("WT000006")).await.unwrap();

        let result = store
            .update("WT000006", |order| {
                order.status = OrderStatus::Delivered;
                Err(StoreError::Invalid("rejected".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.get("WT000006").unwrap().status, OrderStatus::Created);
    }
}
