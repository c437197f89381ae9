//! Realtime channel events and their merge rules.

use std::collections::HashMap;

use realtime::{Coordinates, DeliveryId, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parcel::{LiveParcel, User};
use crate::store::LiveState;

pub const TRACKING_UPDATED: &str = "tracking:updated";
pub const PARCEL_UPDATED: &str = "parcel:updated";
pub const USER_STATUS_UPDATED: &str = "user:status-updated";
pub const REGISTER_USER: &str = "registerUser";

/// `tracking:updated` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    #[serde(alias = "deliveryId")]
    pub parcel_id: DeliveryId,
    pub coordinates: Coordinates,
}

/// Lifecycle and data events delivered by the realtime transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connecting,
    Connected,
    Disconnected { reason: Option<String> },
    Message { event: String, payload: Value },
}

impl TransportEvent {
    #[must_use]
    pub fn message(event: impl Into<String>, payload: Value) -> Self {
        Self::Message { event: event.into(), payload }
    }
}

/// Why an inbound message changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    NotConnected,
    UnknownEvent,
    InvalidPayload,
    NoRecord,
    OtherUser,
}

/// Result of merging one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Applied,
    Ignored(Ignored),
}

/// Merges one decoded payload into the state.
pub type Route = fn(&mut LiveState, Value) -> Result<Merge>;

/// Dispatch table keyed by event name.
#[must_use]
pub fn routes() -> HashMap<&'static str, Route> {
    HashMap::from([
        (TRACKING_UPDATED, location_updated as Route),
        (PARCEL_UPDATED, parcel_updated as Route),
        (USER_STATUS_UPDATED, user_status_updated as Route),
    ])
}

/// Location events never create records.
///
/// # Errors
///
/// Returns `InvalidFormat` when the payload is not a location update or its
/// coordinates are out of range.
pub fn location_updated(state: &mut LiveState, payload: Value) -> Result<Merge> {
    let update: LocationUpdate = serde_json::from_value(payload)?;
    if !update.coordinates.is_valid() {
        let Coordinates { lat, lng } = update.coordinates;
        let message = format!("coordinates out of range: {lat},{lng}");
        return Err(realtime::Error::InvalidFormat(message));
    }
    if state.update_location(&update.parcel_id, update.coordinates) {
        Ok(Merge::Applied)
    } else {
        Ok(Merge::Ignored(Ignored::NoRecord))
    }
}

/// Status events create or overwrite the full record.
///
/// # Errors
///
/// Returns `InvalidFormat` when the payload is not a parcel.
pub fn parcel_updated(state: &mut LiveState, payload: Value) -> Result<Merge> {
    let parcel: LiveParcel = serde_json::from_value(payload)?;
    state.upsert(parcel);
    Ok(Merge::Applied)
}

/// Only the local user's status is tracked.
///
/// # Errors
///
/// Returns `InvalidFormat` when the payload is not a user.
pub fn user_status_updated(state: &mut LiveState, payload: Value) -> Result<Merge> {
    let user: User = serde_json::from_value(payload)?;
    if state.update_user(user) {
        Ok(Merge::Applied)
    } else {
        Ok(Merge::Ignored(Ignored::OtherUser))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::parcel::ParcelStatus;

    fn id(raw: &str) -> DeliveryId {
        DeliveryId::new(raw).unwrap()
    }

    #[test]
    fn dispatch_table_covers_inbound_events() {
        let routes = routes();
        assert_eq!(routes.len(), 3);
        for event in [TRACKING_UPDATED, PARCEL_UPDATED, USER_STATUS_UPDATED] {
            assert!(routes.contains_key(event), "missing route for {event}");
        }
        assert!(!routes.contains_key(REGISTER_USER));
    }

    #[test]
    fn location_before_parcel_is_dropped() {
        let mut state = LiveState::default();
        let payload = json!({"parcelId": "p-1", "coordinates": {"lat": 23.81, "lng": 90.41}});

        let merge = location_updated(&mut state, payload).unwrap();
        assert_eq!(merge, Merge::Ignored(Ignored::NoRecord));
        assert!(state.parcel(&id("p-1")).is_none());
    }

    #[test]
    fn replayed_events_are_idempotent() {
        let mut state = LiveState::default();
        let parcel = json!({"_id": "p-1", "status": "Picked Up"});
        let location = json!({"parcelId": "p-1", "coordinates": {"lat": 23.81, "lng": 90.41}});

        for _ in 0..2 {
            parcel_updated(&mut state, parcel.clone()).unwrap();
            location_updated(&mut state, location.clone()).unwrap();
        }

        assert_eq!(state.len(), 1);
        let record = state.parcel(&id("p-1")).unwrap();
        assert_eq!(record.status, ParcelStatus::PickedUp);
        assert_eq!(record.last_coordinates, Some(Coordinates::new(23.81, 90.41)));
    }

    #[test]
    fn invalid_payload_is_an_error() {
        let mut state = LiveState::default();
        let err = parcel_updated(&mut state, json!({"status": "Assigned"})).unwrap_err();
        assert!(matches!(err, realtime::Error::InvalidFormat(_)));
    }

    #[test]
    fn blank_ids_are_rejected() {
        let mut state = LiveState::default();
        let err = parcel_updated(&mut state, json!({"_id": "   ", "status": "Assigned"}))
            .unwrap_err();
        assert!(matches!(err, realtime::Error::InvalidFormat(_)));

        let payload = json!({"parcelId": "", "coordinates": {"lat": 1.0, "lng": 2.0}});
        assert!(location_updated(&mut state, payload).is_err());
        assert!(state.is_empty());
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn out_of_range_location_is_rejected() {
        let mut state = LiveState::default();
        parcel_updated(&mut state, json!({"_id": "p-1", "status": "In Transit"})).unwrap();

        let payload = json!({"parcelId": "p-1", "coordinates": {"lat": 123.0, "lng": 90.41}});
        let err = location_updated(&mut state, payload).unwrap_err();
        assert!(matches!(err, realtime::Error::InvalidFormat(_)));
        assert!(state.parcel(&id("p-1")).unwrap().last_coordinates.is_none());
    }

    #[test]
    fn delivery_id_alias() {
        let update: LocationUpdate = serde_json::from_value(
            json!({"deliveryId": "p-9", "coordinates": {"lat": 1.0, "lng": 2.0}}),
        )
        .unwrap();
        assert_eq!(update.parcel_id.as_str(), "p-9");
    }
}
