//! # Tracking Session
//!
//! Drives sampler → throttle → publisher for the active delivery. One task
//! runs per delivery; changing or clearing the delivery stops the task and
//! clears its watch before anything new starts.

use realtime::{DeliveryId, HttpRequest, Identity, Result};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::publisher::Publisher;
use crate::sampler::{SampleError, Sampler, SamplerHandle};
use crate::throttle::{Throttle, ThrottleConfig};

/// User-facing tracking state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum TrackingStatus {
    /// No active delivery.
    Idle,

    /// Sampling and publishing for the delivery.
    Tracking(DeliveryId),

    /// Location permission was refused; the user must re-enable it.
    PermissionDenied(String),

    /// The device could not produce positions.
    Unavailable(String),
}

struct Active {
    delivery_id: DeliveryId,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct Tracker<P> {
    sampler: Sampler,
    publisher: Publisher<P>,
    throttle: ThrottleConfig,
    status: watch::Sender<TrackingStatus>,
    active: Option<Active>,
}

impl<P> Tracker<P>
where
    P: HttpRequest + Identity + 'static,
{
    #[must_use]
    pub fn new(sampler: Sampler, publisher: Publisher<P>, throttle: ThrottleConfig) -> Self {
        let (status, _) = watch::channel(TrackingStatus::Idle);
        Self { sampler, publisher, throttle, status, active: None }
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<TrackingStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn delivery_id(&self) -> Option<&DeliveryId> {
        self.active.as_ref().map(|active| &active.delivery_id)
    }

    /// Follow the active delivery. `None` stops tracking.
    ///
    /// Setting the delivery already being tracked is a no-op, unless its
    /// session ended on a sampler error, in which case sampling restarts.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` or `Unavailable` when sampling cannot start.
    /// The status channel carries the same outcome.
    pub async fn set_delivery(&mut self, delivery_id: Option<DeliveryId>) -> Result<()> {
        if let Some(active) = &self.active
            && Some(&active.delivery_id) == delivery_id.as_ref()
            && !active.task.is_finished()
        {
            return Ok(());
        }

        self.stop().await;
        let Some(delivery_id) = delivery_id else {
            return Ok(());
        };

        let handle = match self.sampler.start().await {
            Ok(handle) => handle,
            Err(e) => {
                let status = match &e {
                    realtime::Error::PermissionDenied(reason) => {
                        TrackingStatus::PermissionDenied(reason.clone())
                    }
                    other => TrackingStatus::Unavailable(other.to_string()),
                };
                self.status.send_replace(status);
                return Err(e);
            }
        };

        info!(delivery_id = %delivery_id, watch = %handle.id(), "tracking started");
        self.status.send_replace(TrackingStatus::Tracking(delivery_id.clone()));

        let (shutdown, shutdown_rx) = oneshot::channel();
        let session = Session {
            handle,
            throttle: Throttle::new(self.throttle),
            publisher: self.publisher.clone(),
            delivery_id: delivery_id.clone(),
            status: self.status.clone(),
        };
        let task = tokio::spawn(session.run(shutdown_rx));

        self.active = Some(Active { delivery_id, shutdown, task });
        Ok(())
    }

    /// Stop tracking and wait for the watch to be cleared.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        // the task may already have ended on a fatal sampler error
        let _ = active.shutdown.send(());
        if let Err(e) = active.task.await {
            warn!(delivery_id = %active.delivery_id, error = %e, "tracking task ended abnormally");
        }

        if matches!(*self.status.borrow(), TrackingStatus::Tracking(_)) {
            self.status.send_replace(TrackingStatus::Idle);
        }
        info!(delivery_id = %active.delivery_id, "tracking stopped");
    }
}

struct Session<P> {
    handle: SamplerHandle,
    throttle: Throttle,
    publisher: Publisher<P>,
    delivery_id: DeliveryId,
    status: watch::Sender<TrackingStatus>,
}

impl<P: HttpRequest + Identity> Session<P> {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            let next = tokio::select! {
                _ = &mut shutdown => break,
                next = self.handle.next() => next,
            };
            let Some(next) = next else {
                warn!(delivery_id = %self.delivery_id, "sample queue closed");
                self.status.send_replace(TrackingStatus::Unavailable(
                    "position watch closed".to_string(),
                ));
                break;
            };

            match next {
                Ok(sample) => {
                    if !self.throttle.should_send(&sample) {
                        debug!(monotonic_counter.samples_throttled = 1);
                        continue;
                    }
                    // the checkpoint has already advanced; failures are not retried
                    let publish = self.publisher.publish(&self.delivery_id, sample.coordinates());
                    let published = tokio::select! {
                        _ = &mut shutdown => break,
                        published = publish => published,
                    };
                    match published {
                        Ok(_) => info!(
                            monotonic_counter.samples_sent = 1, delivery_id = %self.delivery_id
                        ),
                        Err(e) => error!(
                            monotonic_counter.publish_errors = 1, error = %e,
                            delivery_id = %self.delivery_id
                        ),
                    }
                }
                Err(e) if !e.is_fatal() => {
                    debug!(delivery_id = %self.delivery_id, error = %e, "position fix timed out");
                }
                Err(e) => {
                    error!(
                        monotonic_counter.sampler_errors = 1, error = %e,
                        delivery_id = %self.delivery_id
                    );
                    let status = match e {
                        SampleError::PermissionDenied(reason) => {
                            TrackingStatus::PermissionDenied(reason)
                        }
                        other => TrackingStatus::Unavailable(other.to_string()),
                    };
                    self.status.send_replace(status);
                    break;
                }
            }
        }

        self.handle.stop();
    }
}
