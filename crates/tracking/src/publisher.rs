//! # Location Publisher
//!
//! Sends accepted samples to the tracking service with `POST /track`.

use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request};
use realtime::{Coordinates, DeliveryId, HttpRequest, Identity, Result, bad_gateway};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackRequest<'a> {
    parcel_id: &'a str,
    coordinates: Coordinates,
}

/// Tracking service acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct Publisher<P> {
    base_url: String,
    provider: Arc<P>,
}

impl<P> Clone for Publisher<P> {
    fn clone(&self) -> Self {
        Self { base_url: self.base_url.clone(), provider: Arc::clone(&self.provider) }
    }
}

impl<P: HttpRequest + Identity> Publisher<P> {
    #[must_use]
    pub fn new(base_url: impl Into<String>, provider: Arc<P>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, provider }
    }

    /// Publish one position against `delivery_id`.
    ///
    /// # Errors
    ///
    /// Returns `BadGateway` when the request fails or the service does not
    /// acknowledge it, and `InvalidFormat` when the response is undecodable.
    pub async fn publish(&self, delivery_id: &DeliveryId, coordinates: Coordinates) -> Result<Ack> {
        let body = TrackRequest { parcel_id: delivery_id.as_str(), coordinates };
        let body = serde_json::to_vec(&body).context("serializing track request")?;

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("{}/track", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(token) = self.provider.access_token().await.context("getting access token")? {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Bytes::from(body)).context("building track request")?;

        let response = self
            .provider
            .fetch(request)
            .await
            .map_err(|e| bad_gateway!("track request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(bad_gateway!("track request returned {}", status));
        }

        let ack: Ack = serde_json::from_slice(response.body())?;
        if !ack.success {
            let reason = ack.message.unwrap_or_default();
            return Err(bad_gateway!("track not acknowledged: {}", reason));
        }

        debug!(
            delivery_id = %delivery_id, lat = coordinates.lat, lng = coordinates.lng,
            "position published"
        );
        Ok(ack)
    }
}
