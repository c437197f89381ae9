//! Seeds the live store from `GET /track/live`.

use anyhow::Context;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION};
use http::{Method, Request};
use realtime::{HttpRequest, Identity, Result, bad_gateway};
use serde_json::Value;
use tracing::{info, warn};

use crate::parcel::LiveParcel;
use crate::store::SharedState;

/// Fetch every live parcel. Entries that do not decode are skipped.
///
/// # Errors
///
/// Returns `BadGateway` when the request fails or is rejected, and
/// `InvalidFormat` when the body is not a parcel list.
pub async fn fetch_live<P>(base_url: &str, provider: &P) -> Result<Vec<LiveParcel>>
where
    P: HttpRequest + Identity,
{
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(format!("{}/track/live", base_url.trim_end_matches('/')))
        .header(ACCEPT, "application/json");
    if let Some(token) = provider.access_token().await.context("getting access token")? {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Bytes::new()).context("building live request")?;

    let response =
        provider.fetch(request).await.map_err(|e| bad_gateway!("live request failed: {}", e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(bad_gateway!("live request returned {}", status));
    }

    // bare array or `{ data: [...] }`
    let body: Value = serde_json::from_slice(response.body())?;
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(realtime::Error::MissingField("data".to_string())),
        },
        other => {
            return Err(realtime::Error::InvalidFormat(format!("expected parcel list: {other}")));
        }
    };

    let parcels = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<LiveParcel>(entry) {
            Ok(parcel) => Some(parcel),
            Err(e) => {
                warn!(monotonic_counter.seed_skipped = 1, error = %e, "skipping live parcel");
                None
            }
        })
        .collect();
    Ok(parcels)
}

/// Replace the store's contents with a fresh fetch. Returns the record count.
///
/// # Errors
///
/// Propagates errors from [`fetch_live`]; the store is left untouched.
pub async fn seed<P>(base_url: &str, provider: &P, state: &SharedState) -> Result<usize>
where
    P: HttpRequest + Identity,
{
    let parcels = fetch_live(base_url, provider).await?;
    let count = parcels.len();
    state.write().await.replace_all(parcels);
    info!(parcels = count, "live state seeded");
    Ok(count)
}
