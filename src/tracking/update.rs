use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::order::{GeoPoint, NewRoutePoint, OrderStatus, RoutePoint};
use crate::notify::{NotificationJob, notify_later};
use crate::state::AppState;

/// Body of a position/status report for one shipment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub driver_id: Option<u64>,
}

struct ValidUpdate {
    position: GeoPoint,
    location: String,
    status: Option<OrderStatus>,
    description: String,
    driver_id: Option<u64>,
}

impl TrackingUpdate {
    fn validate(self) -> Result<ValidUpdate, AppError> {
        let (Some(lat), Some(lng)) = (self.lat, self.lng) else {
            return Err(AppError::BadRequest("lat and lng are required".to_string()));
        };

        let position = GeoPoint { lat, lng };
        if !position.is_valid() {
            return Err(AppError::BadRequest(format!(
                "coordinates out of range: lat={lat}, lng={lng}"
            )));
        }

        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| AppError::BadRequest("location is required".to_string()))?;

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<OrderStatus>().map_err(AppError::BadRequest)?),
        };

        Ok(ValidUpdate {
            position,
            location,
            status,
            description: self.description.unwrap_or_default().trim().to_string(),
            driver_id: self.driver_id,
        })
    }
}

/// Appends a timestamped route point to the order and queues a
/// `location_update` notification. The notification is best-effort and never
/// undoes the persisted point.
pub async fn apply_tracking_update(
    state: &AppState,
    tracking_number: &str,
    update: TrackingUpdate,
) -> Result<RoutePoint, AppError> {
    let update = update.validate()?;

    let draft = NewRoutePoint {
        lat: update.position.lat,
        lng: update.position.lng,
        location: update.location,
        status: update.status,
        description: update.description,
    };
    let order = state
        .orders
        .append_route_point(tracking_number, draft, update.driver_id)
        .await?;

    let point = order
        .last_point()
        .cloned()
        .ok_or_else(|| AppError::Internal("route point was not appended".to_string()))?;

    state.metrics.route_points_appended_total.inc();
    info!(
        tracking_number = %order.tracking_number,
        location = %point.location,
        status = %order.status,
        route_len = order.route.len(),
        "route point appended"
    );

    notify_later(
        state,
        NotificationJob::new(
            NotificationKind::LocationUpdate,
            order.client_chat_id.clone(),
            json!({
                "trackingNumber": order.tracking_number,
                "location": point.location,
                "status": order.status,
                "lat": point.lat,
                "lng": point.lng,
                "description": point.description,
            }),
        ),
    );

    Ok(point)
}
