//! # Update Throttle
//!
//! Hysteresis filter deciding which samples are worth transmitting. A sample
//! goes out when it is the first of a session, when enough time has passed
//! since the last transmitted sample, or when the device has moved far enough
//! from it. Nothing is smoothed: a single noisy fix beyond the distance
//! threshold is sent as-is.

use chrono::{DateTime, Duration, Utc};
use realtime::Coordinates;

use crate::geo::{PositionSample, haversine};

const MIN_INTERVAL_SECS: i64 = 10;
const MIN_DISTANCE_METERS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Elapsed time that must be exceeded before resending.
    pub min_interval: Duration,

    /// Displacement that must be exceeded before resending.
    pub min_distance_meters: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::seconds(MIN_INTERVAL_SECS),
            min_distance_meters: MIN_DISTANCE_METERS,
        }
    }
}

/// The last transmitted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub last_sent_coordinates: Coordinates,
    pub last_sent_at: DateTime<Utc>,
}

impl From<&PositionSample> for Checkpoint {
    fn from(sample: &PositionSample) -> Self {
        Self { last_sent_coordinates: sample.coordinates(), last_sent_at: sample.captured_at }
    }
}

/// Whether `sample` is significant relative to `checkpoint`.
#[must_use]
pub fn is_significant(
    sample: &PositionSample, checkpoint: Option<&Checkpoint>, config: &ThrottleConfig,
) -> bool {
    let Some(checkpoint) = checkpoint else {
        return true;
    };

    let elapsed = sample.captured_at - checkpoint.last_sent_at;
    if elapsed > config.min_interval {
        return true;
    }

    haversine(checkpoint.last_sent_coordinates, sample.coordinates()) > config.min_distance_meters
}

/// Owns the checkpoint for one tracking session.
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    config: ThrottleConfig,
    checkpoint: Option<Checkpoint>,
}

impl Throttle {
    #[must_use]
    pub const fn new(config: ThrottleConfig) -> Self {
        Self { config, checkpoint: None }
    }

    /// Decide whether to send `sample`, advancing the checkpoint when it is.
    ///
    /// The checkpoint moves before the sample is published and is never
    /// rolled back on publish failure.
    pub fn should_send(&mut self, sample: &PositionSample) -> bool {
        if !is_significant(sample, self.checkpoint.as_ref(), &self.config) {
            return false;
        }
        self.checkpoint = Some(Checkpoint::from(sample));
        true
    }

    pub fn reset(&mut self) {
        self.checkpoint = None;
    }

    #[must_use]
    pub const fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64, lat: f64, lng: f64) -> PositionSample {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        PositionSample::new(lat, lng, start + Duration::seconds(secs))
    }

    #[test]
    fn first_sample_always_sent() {
        let mut throttle = Throttle::default();
        assert!(throttle.should_send(&at(0, 23.8103, 90.4125)));
        assert_eq!(throttle.checkpoint().unwrap().last_sent_coordinates.lat, 23.8103);
    }

    #[test]
    fn stationary_within_interval_is_held() {
        let mut throttle = Throttle::default();
        assert!(throttle.should_send(&at(0, 23.8103, 90.4125)));
        let before = *throttle.checkpoint().unwrap();

        for secs in [1, 5, 9, 10] {
            assert!(!throttle.should_send(&at(secs, 23.8103, 90.4125)), "sent at {secs}s");
        }
        assert_eq!(throttle.checkpoint(), Some(&before));
    }

    #[test]
    fn stationary_after_interval_is_sent() {
        let mut throttle = Throttle::default();
        assert!(throttle.should_send(&at(0, 23.8103, 90.4125)));
        assert!(throttle.should_send(&at(11, 23.8103, 90.4125)));
        assert!(!throttle.should_send(&at(15, 23.8103, 90.4125)));
    }

    #[test]
    fn displacement_sent_regardless_of_time() {
        let mut throttle = Throttle::default();
        assert!(throttle.should_send(&at(0, 23.8103, 90.4125)));
        // ~11m north, same instant
        assert!(throttle.should_send(&at(0, 23.8104, 90.4125)));
        // ~5.5m further, under threshold
        assert!(!throttle.should_send(&at(1, 23.81045, 90.4125)));
    }

    #[test]
    fn backwards_clock_uses_distance_only() {
        let mut throttle = Throttle::default();
        assert!(throttle.should_send(&at(60, 23.8103, 90.4125)));
        assert!(!throttle.should_send(&at(0, 23.8103, 90.4125)));
        assert!(throttle.should_send(&at(0, 23.8110, 90.4125)));
    }

    #[test]
    fn reset_forgets_checkpoint() {
        let mut throttle = Throttle::default();
        assert!(throttle.should_send(&at(0, 23.8103, 90.4125)));
        throttle.reset();
        assert!(throttle.checkpoint().is_none());
        assert!(throttle.should_send(&at(1, 23.8103, 90.4125)));
    }

    #[test]
    fn custom_thresholds() {
        let config =
            ThrottleConfig { min_interval: Duration::seconds(2), min_distance_meters: 100.0 };
        let checkpoint = Checkpoint::from(&at(0, 0.0, 0.0));
        assert!(!is_significant(&at(2, 0.0005, 0.0), Some(&checkpoint), &config));
        assert!(is_significant(&at(3, 0.0, 0.0), Some(&checkpoint), &config));
        assert!(is_significant(&at(0, 0.001, 0.0), Some(&checkpoint), &config));
    }
}
