//! # Geolocation Sampler
//!
//! Wraps the device's continuous position watch. Samples arrive on an mpsc
//! queue; each watch is cleared exactly once, either explicitly or when its
//! handle is dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use realtime::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::geo::PositionSample;

const SAMPLE_QUEUE: usize = 32;

/// Location permission as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Prompt,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,

    /// Maximum wait for a single fix.
    pub timeout: Duration,

    /// Age under which a cached fix may be reused.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(20),
            maximum_age: Duration::from_secs(30),
        }
    }
}

/// Handle identifying an active device watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Failure signals from the device watch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("timed out waiting for a position fix")]
    Timeout,
}

impl SampleError {
    /// Fatal errors end sampling for the session; timeouts do not.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Timeout)
    }
}

pub type SampleResult = std::result::Result<PositionSample, SampleError>;

/// The device's position capability.
#[async_trait]
pub trait PositionWatch: Send + Sync {
    /// Query the current location permission.
    async fn permission(&self) -> Permission;

    /// Start a continuous watch delivering fixes and errors into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error when the device refuses to start the watch.
    fn watch(
        &self, options: &WatchOptions, sink: mpsc::Sender<SampleResult>,
    ) -> anyhow::Result<WatchId>;

    /// Tear down a watch started by [`PositionWatch::watch`].
    fn clear_watch(&self, id: WatchId);
}

#[derive(Clone)]
pub struct Sampler {
    watch: Arc<dyn PositionWatch>,
    options: WatchOptions,
}

impl Sampler {
    #[must_use]
    pub fn new(watch: Arc<dyn PositionWatch>, options: WatchOptions) -> Self {
        Self { watch, options }
    }

    /// Start sampling.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when location permission has been refused,
    /// or `Unavailable` when the device cannot start a watch.
    pub async fn start(&self) -> Result<SamplerHandle> {
        let permission = self.watch.permission().await;
        if permission == Permission::Denied {
            warn!(monotonic_counter.permission_denied = 1, "location permission denied");
            let reason = "location permission denied".to_string();
            return Err(realtime::Error::PermissionDenied(reason));
        }

        let (sink, samples) = mpsc::channel(SAMPLE_QUEUE);
        let id = self.watch.watch(&self.options, sink).map_err(|e| {
            realtime::Error::Unavailable(format!("starting position watch: {e}"))
        })?;
        debug!(watch = %id, ?permission, "position watch started");

        Ok(SamplerHandle { id, samples, watch: Arc::clone(&self.watch), active: true })
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler").field("options", &self.options).finish_non_exhaustive()
    }
}

/// An active watch. Dropping the handle clears the watch.
pub struct SamplerHandle {
    id: WatchId,
    samples: mpsc::Receiver<SampleResult>,
    watch: Arc<dyn PositionWatch>,
    active: bool,
}

impl SamplerHandle {
    #[must_use]
    pub const fn id(&self) -> WatchId {
        self.id
    }

    /// Next fix or error. `None` once the watch is stopped or the device
    /// closes the queue.
    pub async fn next(&mut self) -> Option<SampleResult> {
        if !self.active {
            return None;
        }
        self.samples.recv().await
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.samples.close();
        self.watch.clear_watch(self.id);
        debug!(watch = %self.id, "position watch cleared");
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for SamplerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerHandle")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
