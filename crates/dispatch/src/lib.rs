//! # Courier Dispatch
//!
//! Keeps the client's live view of in-flight parcels: seeded over HTTP,
//! merged from realtime events, and composed into map markers.

pub mod events;
pub mod parcel;
pub mod seed;
pub mod store;
pub mod subscriber;
pub mod view;

pub use self::events::{Ignored, LocationUpdate, TransportEvent};
pub use self::parcel::*;
pub use self::seed::{fetch_live, seed};
pub use self::store::{LiveState, SharedState};
pub use self::subscriber::{ConnectionState, Outcome, Subscriber};
pub use self::view::*;
