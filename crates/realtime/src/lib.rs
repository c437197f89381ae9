//! # Realtime Core
//!
//! Core modules shared by the courier tracking and dispatch crates.

mod error;
mod provider;
mod types;

pub use crate::error::*;
pub use crate::provider::*;
pub use crate::types::*;
