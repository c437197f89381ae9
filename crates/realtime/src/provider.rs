//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use anyhow::Result;
use bytes::Bytes;
use http::{Request, Response};
use serde_json::Value;

/// The `HttpRequest` trait defines the behavior for calling the remote
/// tracking service.
pub trait HttpRequest: Send + Sync {
    /// Make outbound HTTP request.
    fn fetch(
        &self, request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

/// Credentials for the remote tracking service.
pub trait Identity: Send + Sync {
    /// Bearer token for the current session, if signed in.
    fn access_token(&self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// The `Emitter` trait sends events over the realtime channel.
pub trait Emitter: Send + Sync {
    /// Emit a named event with a JSON payload.
    fn emit(&self, event: &str, payload: Value) -> impl Future<Output = Result<()>> + Send;
}
