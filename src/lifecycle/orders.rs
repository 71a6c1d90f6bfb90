use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::DriverStatus;
use crate::models::notification::NotificationKind;
use crate::models::order::{Bid, Cargo, GeoPoint, Order, OrderStatus, RoutePoint};
use crate::notify::{NotificationJob, notify_later};
use crate::state::AppState;
use crate::store::StoreError;

const TRACKING_PREFIX: &str = "WT";
const TRACKING_ATTEMPTS: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub tracking_number: Option<String>,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: Option<String>,
    pub client_chat_id: Option<String>,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub description: String,
    pub cargo: Cargo,
    pub price: Option<f64>,
    pub origin_coords: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub driver_id: u64,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub driver_id: u64,
    pub price: Option<f64>,
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn valid_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::BadRequest("price must be > 0".to_string()));
    }
    Ok(price)
}

fn generate_tracking_number(state: &AppState) -> Result<String, AppError> {
    for _ in 0..TRACKING_ATTEMPTS {
        let candidate = format!("{TRACKING_PREFIX}{:06}", Uuid::new_v4().as_u128() % 1_000_000);
        if !state.orders.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(
        "could not allocate a free tracking number".to_string(),
    ))
}

fn ensure_open(order: &Order) -> Result<(), StoreError> {
    if order.status == OrderStatus::Delivered {
        return Err(StoreError::Conflict(format!(
            "order {} is already delivered",
            order.tracking_number
        )));
    }
    Ok(())
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> Result<Order, AppError> {
    let client_name = required(&payload.client_name, "clientName")?;
    let client_phone = required(&payload.client_phone, "clientPhone")?;
    let origin = required(&payload.origin, "origin")?;
    let destination = required(&payload.destination, "destination")?;

    let cargo = payload.cargo;
    if !(cargo.weight_kg.is_finite() && cargo.weight_kg >= 0.0)
        || !(cargo.volume_m3.is_finite() && cargo.volume_m3 >= 0.0)
    {
        return Err(AppError::BadRequest(
            "cargo weight and volume must be >= 0".to_string(),
        ));
    }

    let price = payload.price.map(valid_price).transpose()?;

    let tracking_number = match non_blank(payload.tracking_number) {
        Some(given) => given.to_uppercase(),
        None => generate_tracking_number(state)?,
    };

    let now = Utc::now();
    let mut route = Vec::new();
    if let Some(coords) = payload.origin_coords {
        if !coords.is_valid() {
            return Err(AppError::BadRequest(
                "origin coordinates out of range".to_string(),
            ));
        }
        route.push(RoutePoint {
            lat: coords.lat,
            lng: coords.lng,
            location: origin.clone(),
            status: OrderStatus::Created,
            description: "Заказ создан".to_string(),
            timestamp: now,
        });
    }

    let order = Order {
        id: Uuid::new_v4(),
        tracking_number,
        client_name,
        client_phone,
        client_email: non_blank(payload.client_email),
        client_chat_id: non_blank(payload.client_chat_id),
        origin,
        destination,
        description: payload.description.trim().to_string(),
        cargo,
        status: OrderStatus::Created,
        driver_id: None,
        price,
        bids: Vec::new(),
        route,
        created_at: now,
        updated_at: now,
    };

    let order = state.orders.create(order).await?;
    info!(tracking_number = %order.tracking_number, order_id = %order.id, "order created");

    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::OrderCreated,
            None,
            json!({
                "trackingNumber": order.tracking_number,
                "from": order.origin,
                "to": order.destination,
                "description": order.description,
            }),
        ),
    );
    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::NewOrder,
            None,
            json!({
                "trackingNumber": order.tracking_number,
                "from": order.origin,
                "to": order.destination,
                "weightKg": order.cargo.weight_kg,
                "volumeM3": order.cargo.volume_m3,
                "carType": order.cargo.car_type,
                "price": order.price,
            }),
        ),
    );

    Ok(order)
}

pub async fn place_bid(
    state: &AppState,
    key: &str,
    payload: BidRequest,
) -> Result<Order, AppError> {
    let price = valid_price(payload.price)?;
    let driver = state.drivers.get(payload.driver_id)?;
    if driver.status != DriverStatus::Active {
        return Err(AppError::BadRequest(format!(
            "driver {} is not active",
            driver.id
        )));
    }

    let order = state
        .orders
        .update(key, |order| {
            ensure_open(order)?;
            order.bids.push(Bid {
                driver_id: driver.id,
                price,
                created_at: Utc::now(),
            });
            order.updated_at = Utc::now();
            Ok(())
        })
        .await?;

    info!(tracking_number = %order.tracking_number, driver_id = driver.id, price, "bid placed");
    Ok(order)
}

pub async fn assign_driver(
    state: &AppState,
    key: &str,
    payload: AssignRequest,
) -> Result<Order, AppError> {
    let driver = state.drivers.get(payload.driver_id)?;
    if driver.status != DriverStatus::Active {
        return Err(AppError::BadRequest(format!(
            "driver {} is not active",
            driver.id
        )));
    }
    let explicit_price = payload.price.map(valid_price).transpose()?;

    let mut previous_status = OrderStatus::Created;
    let order = state
        .orders
        .update(key, |order| {
            ensure_open(order)?;
            previous_status = order.status;

            let price = explicit_price
                .or_else(|| order.latest_bid_from(driver.id).map(|bid| bid.price))
                .or(order.price);

            order.driver_id = Some(driver.id);
            order.price = price;
            order.status = OrderStatus::Assigned;
            order.updated_at = Utc::now();
            Ok(())
        })
        .await?;

    info!(tracking_number = %order.tracking_number, driver_id = driver.id, "driver assigned");

    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::DriverAssigned,
            driver.telegram_chat_id.clone(),
            json!({
                "trackingNumber": order.tracking_number,
                "from": order.origin,
                "to": order.destination,
                "driverName": driver.name,
                "price": order.price,
            }),
        ),
    );
    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::StatusChange,
            order.client_chat_id.clone(),
            json!({
                "trackingNumber": order.tracking_number,
                "oldStatus": previous_status,
                "status": order.status,
            }),
        ),
    );

    Ok(order)
}

pub async fn complete_order(state: &AppState, key: &str) -> Result<Order, AppError> {
    let order = state
        .orders
        .update(key, |order| {
            ensure_open(order)?;
            order.status = OrderStatus::Delivered;
            order.updated_at = Utc::now();
            Ok(())
        })
        .await?;

    let driver_name = order
        .driver_id
        .and_then(|id| state.drivers.get(id).ok())
        .map(|driver| driver.name);

    info!(tracking_number = %order.tracking_number, "order completed");

    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::OrderCompleted,
            order.client_chat_id.clone(),
            json!({
                "trackingNumber": order.tracking_number,
                "from": order.origin,
                "to": order.destination,
                "driverName": driver_name,
            }),
        ),
    );

    Ok(order)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::{
        AssignRequest, BidRequest, CreateOrderRequest, assign_driver, complete_order,
        create_order, place_bid,
    };
    use crate::error::AppError;
    use crate::models::driver::{Driver, DriverStatus, VehicleType};
    use crate::models::notification::NotificationKind;
    use crate::models::order::{Cargo, GeoPoint, OrderStatus};
    use crate::notify::{DisabledSender, NotificationJob};
    use crate::state::AppState;
    use crate::store::Stores;
    use crate::tracking::StreamSettings;

    fn state() -> AppState {
        AppState::new(
            Stores::in_memory(),
            Arc::new(DisabledSender),
            None,
            StreamSettings::default(),
            64,
        )
        .0
    }

    fn state_with_queue() -> (AppState, mpsc::Receiver<NotificationJob>) {
        AppState::new(
            Stores::in_memory(),
            Arc::new(DisabledSender),
            None,
            StreamSettings::default(),
            64,
        )
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            tracking_number: None,
            client_name: "Айгуль".to_string(),
            client_phone: "+77011112233".to_string(),
            client_email: None,
            client_chat_id: Some("5001".to_string()),
            origin: "Алматы".to_string(),
            destination: "Урумчи".to_string(),
            description: "Текстиль".to_string(),
            cargo: Cargo {
                weight_kg: 1500.0,
                volume_m3: 10.0,
                car_type: VehicleType::Tent,
            },
            price: None,
            origin_coords: Some(GeoPoint { lat: 43.24, lng: 76.89 }),
        }
    }

    async fn driver(state: &AppState, status: DriverStatus) -> Driver {
        state
            .drivers
            .register(Driver {
                id: 0,
                name: "Ерлан".to_string(),
                phone: "+77001234567".to_string(),
                phone_variants: Vec::new(),
                vehicle_plate: "123ABC02".to_string(),
                vehicle_type: VehicleType::Tent,
                rating: 5.0,
                rating_count: 0,
                status,
                location: "Алматы".to_string(),
                telegram_chat_id: Some("7001".to_string()),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn created_order_gets_generated_tracking_number_and_initial_point() {
        let (state, mut rx) = state_with_queue();
        let order = create_order(&state, request()).await.unwrap();

        assert!(order.tracking_number.starts_with("WT"));
        assert_eq!(order.tracking_number.len(), 8);
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.route.len(), 1);
        assert_eq!(order.route[0].status, OrderStatus::Created);
        assert_eq!(state.metrics.notification_queue_depth.get(), 2);
        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::OrderCreated);
        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::NewOrder);
    }

    #[tokio::test]
    async fn blank_origin_is_rejected() {
        let state = state();
        let mut req = request();
        req.origin = " ".to_string();

        let result = create_order(&state, req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn assignment_takes_price_from_latest_bid() {
        let state = state();
        let driver = driver(&state, DriverStatus::Active).await;
        let order = create_order(&state, request()).await.unwrap();

        for price in [900.0, 850.0] {
            place_bid(
                &state,
                &order.tracking_number,
                BidRequest {
                    driver_id: driver.id,
                    price,
                },
            )
            .await
            .unwrap();
        }

        let assigned = assign_driver(
            &state,
            &order.tracking_number,
            AssignRequest {
                driver_id: driver.id,
                price: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(assigned.status, OrderStatus::Assigned);
        assert_eq!(assigned.driver_id, Some(driver.id));
        assert_eq!(assigned.price, Some(850.0));
        assert_eq!(assigned.bids.len(), 2);
    }

    #[tokio::test]
    async fn blocked_driver_cannot_bid() {
        let state = state();
        let driver = driver(&state, DriverStatus::Blocked).await;
        let order = create_order(&state, request()).await.unwrap();

        let result = place_bid(
            &state,
            &order.tracking_number,
            BidRequest {
                driver_id: driver.id,
                price: 100.0,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn delivered_order_cannot_be_completed_twice() {
        let state = state();
        let order = create_order(&state, request()).await.unwrap();

        let done = complete_order(&state, &order.id.to_string()).await.unwrap();
        assert_eq!(done.status, OrderStatus::Delivered);

        let again = complete_order(&state, &order.tracking_number).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn explicit_tracking_number_is_kept_and_unique() {
        let state = state();
        let mut req = request();
        req.tracking_number = Some("wt123456".to_string());
        let order = create_order(&state, req).await.unwrap();
        assert_eq!(order.tracking_number, "WT123456");

        let mut dup = request();
        dup.tracking_number = Some("WT123456".to_string());
        assert!(matches!(
            create_order(&state, dup).await,
            Err(AppError::Conflict(_))
        ));
    }
}
