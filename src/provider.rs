//! # Provider
//!
//! Native implementations of the host seams, backed by `reqwest`.

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Request, Response};
use realtime::{HttpRequest, Identity};
use tracing::debug;

use crate::Config;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpClient {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), token }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_token.clone())
    }
}

impl HttpRequest for HttpClient {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let request = reqwest::Request::try_from(request).context("converting request")?;

        let response = self.client.execute(request).await.context("sending request")?;
        let status = response.status();
        debug!(method = %method, uri = %uri, status = %status, "http request");

        let mut builder = Response::builder().status(status).version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let body = response.bytes().await.context("reading response body")?;
        builder.body(body).context("building response")
    }
}

impl Identity for HttpClient {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_from_config() {
        let config = Config { api_token: Some("secret".to_string()), ..Config::default() };
        let client = HttpClient::from_config(&config);
        assert_eq!(client.access_token().await.unwrap().as_deref(), Some("secret"));

        let anonymous = HttpClient::from_config(&Config::default());
        assert!(anonymous.access_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let client = HttpClient::new(None);
        let request = Request::builder()
            .uri("http://127.0.0.1:9/api/track/live")
            .body(Bytes::new())
            .unwrap();
        assert!(client.fetch(request).await.is_err());
    }
}
