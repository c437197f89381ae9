//! Live parcel and user records as exchanged with the tracking service.

use chrono::{DateTime, Utc};
use realtime::{Coordinates, DeliveryId};
use serde::{Deserialize, Serialize};

/// Parcel lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParcelStatus {
    #[serde(rename = "Assigned", alias = "assigned")]
    Assigned,

    #[serde(rename = "Picked Up", alias = "picked_up", alias = "picked-up", alias = "PickedUp")]
    PickedUp,

    #[serde(rename = "In Transit", alias = "in_transit", alias = "in-transit", alias = "InTransit")]
    InTransit,

    #[serde(rename = "Delivered", alias = "delivered")]
    Delivered,

    #[serde(rename = "Failed", alias = "failed")]
    Failed,
}

impl ParcelStatus {
    /// Statuses that keep a parcel on the live map.
    pub const ACTIVE: [Self; 3] = [Self::Assigned, Self::PickedUp, Self::InTransit];

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Assigned | Self::PickedUp | Self::InTransit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub phone: String,
}

/// The client's view of one delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveParcel {
    #[serde(rename = "_id", alias = "id", alias = "parcelId", alias = "deliveryId")]
    pub delivery_id: DeliveryId,

    pub status: ParcelStatus,

    /// Last known position; GeoJSON `Point` on the wire.
    #[serde(
        rename = "currentLocation",
        default,
        with = "point",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<Agent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    /// When this record was last merged locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LiveParcel {
    #[must_use]
    pub const fn new(delivery_id: DeliveryId, status: ParcelStatus) -> Self {
        Self {
            delivery_id,
            status,
            last_coordinates: None,
            assigned_agent: None,
            tracking_number: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn at(mut self, coordinates: Coordinates) -> Self {
        self.last_coordinates = Some(coordinates);
        self
    }
}

/// The locally authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id", alias = "userId")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

mod point {
    use realtime::Coordinates;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct GeoPoint {
        #[serde(rename = "type", default = "point_type")]
        kind: String,
        coordinates: [f64; 2],
    }

    fn point_type() -> String {
        "Point".to_string()
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Coordinates>, serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(|c| GeoPoint { kind: point_type(), coordinates: c.to_lng_lat() })
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Coordinates>, D::Error> {
        let point = Option::<GeoPoint>::deserialize(deserializer)?;
        Ok(point.map(|p| Coordinates::from_lng_lat(p.coordinates)))
    }
}
