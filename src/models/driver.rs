use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Tent,
    Refrigerator,
    Container,
    Special,
    CarCarrier,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    Inactive,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: u64,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub phone_variants: Vec<String>,
    pub vehicle_plate: String,
    pub vehicle_type: VehicleType,
    pub rating: f64,
    #[serde(default)]
    pub rating_count: u32,
    pub status: DriverStatus,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Driver {
    /// Folds a new score into the running average.
    pub fn record_rating(&mut self, rating: u8) {
        let total = self.rating * f64::from(self.rating_count) + f64::from(rating);
        self.rating_count = self.rating_count.saturating_add(1);
        self.rating = total / f64::from(self.rating_count);
    }
}

/// What the phone search hands back to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub vehicle_plate: String,
    pub vehicle_type: VehicleType,
    pub rating: f64,
    pub status: DriverStatus,
    pub location: String,
}

impl From<&Driver> for DriverSummary {
    fn from(driver: &Driver) -> Self {
        Self {
            id: driver.id,
            name: driver.name.clone(),
            phone: driver.phone.clone(),
            vehicle_plate: driver.vehicle_plate.clone(),
            vehicle_type: driver.vehicle_type,
            rating: driver.rating,
            status: driver.status,
            location: driver.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> Driver {
        Driver {
            id: 1,
            name: "Ерлан".to_string(),
            phone: "+77001234567".to_string(),
            phone_variants: Vec::new(),
            vehicle_plate: "123ABC02".to_string(),
            vehicle_type: VehicleType::Tent,
            rating: 0.0,
            rating_count: 0,
            status: DriverStatus::Active,
            location: "Алматы".to_string(),
            telegram_chat_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_rating_replaces_initial_value() {
        let mut d = driver();
        d.record_rating(4);
        assert_eq!(d.rating, 4.0);
        assert_eq!(d.rating_count, 1);
    }

    #[test]
    fn ratings_are_averaged() {
        let mut d = driver();
        d.record_rating(5);
        d.record_rating(3);
        assert!((d.rating - 4.0).abs() < 1e-9);
        assert_eq!(d.rating_count, 2);
    }

    #[test]
    fn vehicle_type_uses_snake_case_labels() {
        assert_eq!(serde_json::to_value(VehicleType::CarCarrier).unwrap(), "car_carrier");
    }
}
