use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::driver::{Driver, DriverStatus, DriverSummary, VehicleType};
use crate::models::notification::NotificationKind;
use crate::notify::{NotificationJob, notify_later};
use crate::phone;
use crate::state::AppState;

const MIN_PHONE_DIGITS: usize = 10;
const INITIAL_RATING: f64 = 5.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDriverRequest {
    pub name: String,
    pub phone: String,
    pub vehicle_plate: String,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub location: String,
    pub telegram_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDriverRequest {
    pub rating: u8,
    pub comment: Option<String>,
    pub order_id: Option<String>,
}

pub async fn register_driver(
    state: &AppState,
    payload: RegisterDriverRequest,
) -> Result<Driver, AppError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let plate = payload.vehicle_plate.trim().to_uppercase();
    if plate.is_empty() {
        return Err(AppError::BadRequest(
            "vehiclePlate cannot be empty".to_string(),
        ));
    }

    if phone::digits_only(&payload.phone).len() < MIN_PHONE_DIGITS {
        return Err(AppError::BadRequest(format!(
            "phone must contain at least {MIN_PHONE_DIGITS} digits"
        )));
    }

    let driver = Driver {
        id: 0,
        name,
        phone: phone::normalize(&payload.phone),
        phone_variants: phone::variants(&payload.phone),
        vehicle_plate: plate,
        vehicle_type: payload.vehicle_type,
        rating: INITIAL_RATING,
        rating_count: 0,
        status: DriverStatus::Active,
        location: payload.location.trim().to_string(),
        telegram_chat_id: payload
            .telegram_chat_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
        created_at: Utc::now(),
    };

    let driver = state.drivers.register(driver).await?;
    info!(driver_id = driver.id, phone = %driver.phone, "driver registered");

    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::DriverRegistered,
            None,
            json!({
                "driverId": driver.id,
                "driverName": driver.name,
                "vehiclePlate": driver.vehicle_plate,
            }),
        ),
    );

    Ok(driver)
}

pub async fn rate_driver(
    state: &AppState,
    driver_id: u64,
    payload: RateDriverRequest,
) -> Result<Driver, AppError> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let route = match payload.order_id.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Some(state.orders.get(key)?.route_label()),
        _ => None,
    };

    let driver = state
        .drivers
        .update(driver_id, |driver| {
            driver.record_rating(payload.rating);
            Ok(())
        })
        .await?;

    info!(driver_id, rating = payload.rating, average = driver.rating, "driver rated");

    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::DriverRating,
            driver.telegram_chat_id.clone(),
            json!({
                "rating": payload.rating,
                "comment": payload.comment,
                "route": route,
            }),
        ),
    );

    Ok(driver)
}

pub fn find_driver_by_phone(state: &AppState, raw_phone: &str) -> Result<DriverSummary, AppError> {
    if raw_phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone is required".to_string()));
    }

    match state.drivers.find_by_phone(raw_phone) {
        Some(driver) => {
            state
                .metrics
                .driver_lookups_total
                .with_label_values(&["found"])
                .inc();
            Ok(DriverSummary::from(&driver))
        }
        None => {
            state
                .metrics
                .driver_lookups_total
                .with_label_values(&["not_found"])
                .inc();
            Err(AppError::NotFound(format!(
                "no driver registered with phone {}",
                phone::normalize(raw_phone)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        RateDriverRequest, RegisterDriverRequest, find_driver_by_phone, rate_driver,
        register_driver,
    };
    use crate::error::AppError;
    use crate::models::driver::VehicleType;
    use crate::notify::DisabledSender;
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

    fn request(phone: &str) -> RegisterDriverRequest {
        RegisterDriverRequest {
            name: "Ерлан".to_string(),
            phone: phone.to_string(),
            vehicle_plate: "123abc02".to_string(),
            vehicle_type: VehicleType::Refrigerator,
            location: "Алматы".to_string(),
            telegram_chat_id: None,
        }
    }

    #[tokio::test]
    async fn registration_stores_canonical_phone() {
        let state = state();
        let driver = register_driver(&state, request("8 (700) 123-45-67")).await.unwrap();

        assert_eq!(driver.phone, "+77001234567");
        assert_eq!(driver.vehicle_plate, "123ABC02");
        assert!(driver.phone_variants.contains(&"87001234567".to_string()));
    }

    #[tokio::test]
    async fn short_phone_is_rejected() {
        let state = state();
        let result = register_driver(&state, request("12345")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn lookup_accepts_either_prefix() {
        let state = state();
        register_driver(&state, request("+7 700 123 45 67")).await.unwrap();

        assert_eq!(find_driver_by_phone(&state, "87001234567").unwrap().name, "Ерлан");
        assert_eq!(find_driver_by_phone(&state, "77001234567").unwrap().name, "Ерлан");
        assert!(matches!(
            find_driver_by_phone(&state, "+77770000000"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            find_driver_by_phone(&state, "  "),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn rating_out_of_range_is_rejected_and_valid_rating_averaged() {
        let state = state();
        let driver = register_driver(&state, request("+77001234567")).await.unwrap();

        let bad = rate_driver(
            &state,
            driver.id,
            RateDriverRequest {
                rating: 6,
                comment: None,
                order_id: None,
            },
        )
        .await;
        assert!(matches!(bad, Err(AppError::BadRequest(_))));

        let rated = rate_driver(
            &state,
            driver.id,
            RateDriverRequest {
                rating: 3,
                comment: Some("Опоздал".to_string()),
                order_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(rated.rating, 3.0);
        assert_eq!(rated.rating_count, 1);
    }
}
