//! # Realtime Subscriber
//!
//! Observes the transport's lifecycle and merges inbound events into the
//! live store. Reconnection is the transport's job; this only tracks state.

use std::collections::HashMap;
use std::sync::Arc;

use realtime::Emitter;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::events::{self, Ignored, Merge, REGISTER_USER, Route, TransportEvent};
use crate::store::SharedState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// What handling one transport event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Connection(ConnectionState),
    Applied,
    Ignored(Ignored),
}

impl From<Merge> for Outcome {
    fn from(merge: Merge) -> Self {
        match merge {
            Merge::Applied => Self::Applied,
            Merge::Ignored(reason) => Self::Ignored(reason),
        }
    }
}

pub struct Subscriber<E> {
    emitter: Arc<E>,
    state: SharedState,
    connection: ConnectionState,
    routes: HashMap<&'static str, Route>,
}

impl<E: Emitter> Subscriber<E> {
    #[must_use]
    pub fn new(emitter: Arc<E>, state: SharedState) -> Self {
        Self { emitter, state, connection: ConnectionState::Disconnected, routes: events::routes() }
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Drain transport events until the queue closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        self.connection = ConnectionState::Disconnected;
        info!("transport closed");
    }

    pub async fn handle(&mut self, event: TransportEvent) -> Outcome {
        match event {
            TransportEvent::Connecting => self.transition(ConnectionState::Connecting),
            TransportEvent::Connected => {
                let entering = self.connection != ConnectionState::Connected;
                let outcome = self.transition(ConnectionState::Connected);
                if entering {
                    self.register().await;
                }
                outcome
            }
            TransportEvent::Disconnected { reason } => {
                if let Some(reason) = reason {
                    warn!(reason = %reason, "realtime disconnected");
                }
                self.transition(ConnectionState::Disconnected)
            }
            TransportEvent::Message { event, payload } => {
                if self.connection != ConnectionState::Connected {
                    debug!(event = %event, "message while not connected");
                    return Outcome::Ignored(Ignored::NotConnected);
                }
                let Some(route) = self.routes.get(event.as_str()) else {
                    warn!(monotonic_counter.events_dropped = 1, event = %event, "unknown event");
                    return Outcome::Ignored(Ignored::UnknownEvent);
                };

                let mut state = self.state.write().await;
                match route(&mut state, payload) {
                    Ok(merge) => {
                        if let Merge::Ignored(reason) = merge {
                            debug!(event = %event, reason = ?reason, "event not applied");
                        } else {
                            debug!(monotonic_counter.events_applied = 1, event = %event);
                        }
                        merge.into()
                    }
                    Err(e) => {
                        warn!(
                            monotonic_counter.events_dropped = 1, event = %event, error = %e,
                            "invalid payload"
                        );
                        Outcome::Ignored(Ignored::InvalidPayload)
                    }
                }
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) -> Outcome {
        if self.connection != next {
            info!(from = ?self.connection, to = ?next, "realtime connection");
        }
        self.connection = next;
        Outcome::Connection(next)
    }

    async fn register(&self) {
        let user_id = self.state.read().await.user().map(|user| user.id.clone());
        let Some(user_id) = user_id else {
            debug!("no local user; skipping registration");
            return;
        };
        if let Err(e) = self.emitter.emit(REGISTER_USER, json!(user_id)).await {
            error!(user_id = %user_id, error = %e, "failed to register user");
        }
    }
}
