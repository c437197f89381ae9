//! In-memory live parcel state.
//!
//! A single writer (the realtime subscriber or a seed) mutates the state;
//! readers observe the `revision` to decide when to recompose.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use realtime::{Coordinates, DeliveryId};
use tokio::sync::RwLock;

use crate::parcel::{LiveParcel, User};

/// State shared between the subscriber loop and its readers.
pub type SharedState = Arc<RwLock<LiveState>>;

#[derive(Debug, Clone, Default)]
pub struct LiveState {
    parcels: BTreeMap<DeliveryId, LiveParcel>,
    user: Option<User>,
    revision: u64,
}

impl LiveState {
    #[must_use]
    pub fn new(user: Option<User>) -> Self {
        Self { user, ..Self::default() }
    }

    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Incremented on every change to parcels or the user.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn parcel(&self, delivery_id: &DeliveryId) -> Option<&LiveParcel> {
        self.parcels.get(delivery_id)
    }

    /// All known parcels, ordered by delivery id.
    pub fn parcels(&self) -> impl Iterator<Item = &LiveParcel> {
        self.parcels.values()
    }

    /// Parcels whose status keeps them on the live map.
    pub fn active(&self) -> impl Iterator<Item = &LiveParcel> {
        self.parcels.values().filter(|parcel| parcel.status.is_active())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Create or overwrite the full record for the parcel.
    pub fn upsert(&mut self, mut parcel: LiveParcel) {
        parcel.updated_at = Some(Utc::now());
        self.parcels.insert(parcel.delivery_id.clone(), parcel);
        self.bump();
    }

    /// Move an existing record. Returns `false`, leaving the state untouched,
    /// when no record exists for `delivery_id`.
    pub fn update_location(&mut self, delivery_id: &DeliveryId, coordinates: Coordinates) -> bool {
        let Some(parcel) = self.parcels.get_mut(delivery_id) else {
            return false;
        };
        parcel.last_coordinates = Some(coordinates);
        parcel.updated_at = Some(Utc::now());
        self.bump();
        true
    }

    /// Replace every record, as after a full refetch.
    pub fn replace_all(&mut self, parcels: impl IntoIterator<Item = LiveParcel>) {
        let now = Utc::now();
        self.parcels = parcels
            .into_iter()
            .map(|mut parcel| {
                parcel.updated_at = Some(now);
                (parcel.delivery_id.clone(), parcel)
            })
            .collect();
        self.bump();
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
        self.bump();
    }

    /// Apply a user update only when it is the local user.
    pub fn update_user(&mut self, user: User) -> bool {
        if !self.user.as_ref().is_some_and(|current| current.id == user.id) {
            return false;
        }
        self.user = Some(user);
        self.bump();
        true
    }

    const fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::ParcelStatus;

    fn id(raw: &str) -> DeliveryId {
        DeliveryId::new(raw).unwrap()
    }

    fn user(id: &str, status: Option<&str>) -> User {
        User { id: id.to_string(), name: None, role: None, status: status.map(ToString::to_string) }
    }

    #[test]
    fn location_without_record_is_dropped() {
        let mut state = LiveState::default();
        assert!(!state.update_location(&id("p-1"), Coordinates::new(1.0, 2.0)));
        assert!(state.is_empty());
        assert_eq!(state.revision(), 0);
    }

    #[test]
    fn upsert_overwrites_whole_record() {
        let mut state = LiveState::default();
        let mut first =
            LiveParcel::new(id("p-1"), ParcelStatus::Assigned).at(Coordinates::new(1.0, 2.0));
        first.tracking_number = Some("CP-1".to_string());
        state.upsert(first);

        state.upsert(LiveParcel::new(id("p-1"), ParcelStatus::InTransit));
        let parcel = state.parcel(&id("p-1")).unwrap();
        assert_eq!(parcel.status, ParcelStatus::InTransit);
        assert!(parcel.last_coordinates.is_none());
        assert!(parcel.tracking_number.is_none());
        assert_eq!(state.len(), 1);
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn location_moves_existing_record() {
        let mut state = LiveState::default();
        state.upsert(LiveParcel::new(id("p-1"), ParcelStatus::PickedUp));
        assert!(state.update_location(&id("p-1"), Coordinates::new(23.8, 90.4)));
        assert_eq!(
            state.parcel(&id("p-1")).unwrap().last_coordinates,
            Some(Coordinates::new(23.8, 90.4))
        );
    }

    #[test]
    fn inactive_parcels_leave_live_set() {
        let mut state = LiveState::default();
        state.upsert(LiveParcel::new(id("p-1"), ParcelStatus::InTransit));
        state.upsert(LiveParcel::new(id("p-2"), ParcelStatus::InTransit));
        state.upsert(LiveParcel::new(id("p-2"), ParcelStatus::Delivered));

        let active: Vec<_> = state.active().map(|p| p.delivery_id.as_str()).collect();
        assert_eq!(active, vec!["p-1"]);
        assert_eq!(state.parcels().count(), 2);
    }

    #[test]
    fn replace_all_drops_unlisted() {
        let mut state = LiveState::default();
        state.upsert(LiveParcel::new(id("p-1"), ParcelStatus::InTransit));
        state.replace_all([LiveParcel::new(id("p-2"), ParcelStatus::Assigned)]);
        assert!(state.parcel(&id("p-1")).is_none());
        assert!(state.parcel(&id("p-2")).is_some());
    }

    #[test]
    fn only_local_user_updates() {
        let mut state = LiveState::new(Some(user("u-1", None)));

        assert!(!state.update_user(user("u-2", Some("offline"))));
        assert!(state.update_user(user("u-1", Some("online"))));
        assert_eq!(state.user().unwrap().status.as_deref(), Some("online"));
    }

    #[test]
    fn anonymous_ignores_user_updates() {
        let mut state = LiveState::default();
        assert!(!state.update_user(user("u-1", None)));
        assert!(state.user().is_none());
    }
}
