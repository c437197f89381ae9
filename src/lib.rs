//! # Courier
//!
//! Wires live tracking for one client: the courier-side tracker that
//! publishes positions, and the dispatcher-side live view fed by the
//! realtime channel.

mod config;
mod provider;

use std::sync::Arc;

use dispatch::{LiveState, LiveView, MarkerDiff, SharedState, Subscriber, TransportEvent, User};
use realtime::{Emitter, HttpRequest, Identity, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use tracking::{PositionWatch, Publisher, Sampler, Tracker};

pub use self::config::Config;
pub use self::provider::HttpClient;

pub struct Courier<P> {
    config: Config,
    provider: Arc<P>,
    tracker: Tracker<P>,
    state: SharedState,
    view: LiveView,
}

impl<P> Courier<P>
where
    P: HttpRequest + Identity + 'static,
{
    #[must_use]
    pub fn new(
        config: Config, provider: Arc<P>, device: Arc<dyn PositionWatch>, user: Option<User>,
    ) -> Self {
        let sampler = Sampler::new(device, config.watch);
        let publisher = Publisher::new(config.api_base_url.clone(), Arc::clone(&provider));
        let tracker = Tracker::new(sampler, publisher, config.throttle);
        let view = LiveView::new(config.view);
        Self { config, provider, tracker, state: LiveState::new(user).shared(), view }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Courier-side tracking session.
    pub const fn tracker(&mut self) -> &mut Tracker<P> {
        &mut self.tracker
    }

    #[must_use]
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Set or clear the signed-in user. Takes effect on the next connect.
    pub async fn set_user(&self, user: Option<User>) {
        self.state.write().await.set_user(user);
    }

    /// Replace the live state with the service's current snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be fetched or decoded.
    pub async fn seed(&self) -> Result<usize> {
        dispatch::seed(&self.config.api_base_url, self.provider.as_ref(), &self.state).await
    }

    /// Start merging realtime events into the live state.
    pub fn subscribe<E>(
        &self, emitter: Arc<E>, events: mpsc::Receiver<TransportEvent>,
    ) -> JoinHandle<()>
    where
        E: Emitter + 'static,
    {
        let subscriber = Subscriber::new(emitter, self.state());
        info!("subscribing to realtime events");
        tokio::spawn(subscriber.run(events))
    }

    /// Recompose the map from the current state.
    pub async fn refresh_view(&mut self) -> Option<MarkerDiff> {
        let state = self.state.read().await;
        self.view.refresh(&state)
    }

    #[must_use]
    pub const fn view(&self) -> &LiveView {
        &self.view
    }

    pub const fn view_mut(&mut self) -> &mut LiveView {
        &mut self.view
    }
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
