//! # Courier Tracking
//!
//! Samples the device position while a delivery is active, throttles the
//! samples by time and distance, and publishes the accepted ones to the
//! tracking service.

pub mod geo;
pub mod publisher;
pub mod sampler;
pub mod session;
pub mod throttle;

pub use self::geo::*;
pub use self::publisher::{Ack, Publisher};
pub use self::sampler::*;
pub use self::session::{Tracker, TrackingStatus};
pub use self::throttle::*;
