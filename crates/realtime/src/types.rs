//! Identifiers and coordinates shared by tracking and dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque identifier correlating position samples and status events with a
/// single parcel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryId(String);

impl DeliveryId {
    /// Create a delivery identifier.
    ///
    /// # Errors
    ///
    /// Returns a `BadRequest` error when the identifier is empty or blank.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::BadRequest("delivery id is empty".to_string()));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for DeliveryId {
    type Error = Error;

    fn try_from(id: &str) -> Result<Self> {
        Self::new(id)
    }
}

impl TryFrom<String> for DeliveryId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<DeliveryId> for String {
    fn from(id: DeliveryId) -> Self {
        id.0
    }
}

/// A WGS84 point, serialized as `{ "lat": .., "lng": .. }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a GeoJSON `[lng, lat]` pair.
    #[must_use]
    pub const fn from_lng_lat([lng, lat]: [f64; 2]) -> Self {
        Self { lat, lng }
    }

    /// GeoJSON `[lng, lat]` ordering.
    #[must_use]
    pub const fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}
