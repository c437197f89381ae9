//! Position samples and great-circle distance.

use chrono::{DateTime, Utc};
use realtime::Coordinates;
use serde::{Deserialize, Serialize};

/// Mean earth radius used by the spherical approximation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A raw fix reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,

    /// Reported accuracy radius, in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl PositionSample {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, captured_at: DateTime<Utc>) -> Self {
        Self { latitude, longitude, captured_at, accuracy: None }
    }

    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Haversine distance between two points, in meters.
#[must_use]
pub fn haversine(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // rounding can push `a` past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const DHAKA: Coordinates = Coordinates::new(23.8103, 90.4125);

    #[test]
    fn self_distance_is_zero() {
        assert!(haversine(DHAKA, DHAKA).abs() < f64::EPSILON);
    }

    #[test]
    fn one_degree_of_latitude() {
        let north = Coordinates::new(1.0, 0.0);
        let distance = haversine(Coordinates::default(), north);
        assert!((distance - 111_194.93).abs() < 1.0, "distance was {distance}");
    }

    #[test]
    fn antipodal_points_are_finite() {
        let half_way = std::f64::consts::PI * EARTH_RADIUS_METERS;
        for (from, to) in [
            (Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 180.0)),
            (DHAKA, Coordinates::new(-DHAKA.lat, DHAKA.lng - 180.0)),
            (Coordinates::new(90.0, 0.0), Coordinates::new(-90.0, 0.0)),
        ] {
            let distance = haversine(from, to);
            assert!(distance.is_finite(), "distance was {distance}");
            assert!((distance - half_way).abs() < 1.0, "distance was {distance}");
        }
    }

    #[test]
    fn symmetric() {
        let chattogram = Coordinates::new(22.3569, 91.7832);
        let there = haversine(DHAKA, chattogram);
        let back = haversine(chattogram, DHAKA);
        assert!((there - back).abs() < 1e-6);
        // roughly 210 km as the crow flies
        assert!((200_000.0..220_000.0).contains(&there), "distance was {there}");
    }

    #[test]
    fn small_offsets() {
        // ~11.1m north
        let moved = Coordinates::new(DHAKA.lat + 0.0001, DHAKA.lng);
        let distance = haversine(DHAKA, moved);
        assert!((11.0..11.3).contains(&distance), "distance was {distance}");
    }
}
