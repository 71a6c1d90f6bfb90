use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::VehicleType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Assigned,
    InTransit,
    Warehouse,
    Delivered,
    Delayed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Assigned => "assigned",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Warehouse => "warehouse",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Delayed => "delayed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "created" => Ok(OrderStatus::Created),
            "assigned" => Ok(OrderStatus::Assigned),
            "in_transit" => Ok(OrderStatus::InTransit),
            "warehouse" => Ok(OrderStatus::Warehouse),
            "delivered" => Ok(OrderStatus::Delivered),
            "delayed" => Ok(OrderStatus::Delayed),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cargo {
    pub weight_kg: f64,
    pub volume_m3: f64,
    pub car_type: VehicleType,
}

/// One waypoint in an order's history. Never modified once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    pub location: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// A waypoint before the store stamps it. `status: None` means the point
/// inherits the order's current status and the order status is kept.
#[derive(Debug, Clone)]
pub struct NewRoutePoint {
    pub lat: f64,
    pub lng: f64,
    pub location: String,
    pub status: Option<OrderStatus>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub driver_id: u64,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub tracking_number: String,
    pub client_name: String,
    pub client_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_chat_id: Option<String>,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub description: String,
    pub cargo: Cargo,
    pub status: OrderStatus,
    #[serde(default)]
    pub driver_id: Option<u64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub bids: Vec<Bid>,
    #[serde(default)]
    pub route: Vec<RoutePoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn last_point(&self) -> Option<&RoutePoint> {
        self.route.last()
    }

    pub fn route_label(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }

    /// Appends a waypoint and mirrors its status onto the order when one was supplied.
    pub fn push_point(&mut self, point: RoutePoint, status_override: Option<OrderStatus>) {
        if let Some(status) = status_override {
            self.status = status;
        }
        self.updated_at = point.timestamp;
        self.route.push(point);
    }

    pub fn latest_bid_from(&self, driver_id: u64) -> Option<&Bid> {
        self.bids.iter().rev().find(|bid| bid.driver_id == driver_id)
    }
}
