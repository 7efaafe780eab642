//! The seam between the application layer and the network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use trailguard_core::domain::catalog::Health;
use trailguard_core::protocol::endpoints;
use trailguard_core::{ApiError, ApiRequest};

use crate::application::cache::Fetcher;

/// Sends one request to the back end and returns its decoded JSON body.
///
/// Implementations map every failure onto [`ApiError`]: unreachable server
/// and timeouts become `Network`, non-2xx answers become `Server`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError>;
}

/// Shared handle to the injected transport.
pub type SharedTransport = Arc<dyn ApiTransport>;

/// Sends `request` and decodes the body as `T`.
///
/// # Errors
///
/// Propagates the transport's error, or [`ApiError::Decode`] when the body
/// does not have the shape of `T`.
pub async fn send_decoded<T: DeserializeOwned>(
    transport: &dyn ApiTransport,
    request: ApiRequest,
) -> Result<T, ApiError> {
    let body = transport.send(request).await?;
    Ok(serde_json::from_value(body)?)
}

/// Wraps a fixed request into a cache [`Fetcher`].
pub fn request_fetcher(transport: &SharedTransport, request: ApiRequest) -> Fetcher {
    let transport = Arc::clone(transport);
    Arc::new(move || {
        let transport = Arc::clone(&transport);
        let request = request.clone();
        Box::pin(async move { transport.send(request).await })
    })
}

/// A fetcher for a query that is never enabled, e.g. one whose project id is
/// still unknown.  Calling it fails with `error` without touching the network.
pub fn unavailable_fetcher(error: ApiError) -> Fetcher {
    Arc::new(move || {
        let error = error.clone();
        Box::pin(async move { Err(error) })
    })
}

/// `GET /health`.
///
/// # Errors
///
/// Any [`ApiError`] raised by the transport or while decoding.
pub async fn health(transport: &dyn ApiTransport) -> Result<Health, ApiError> {
    send_decoded(transport, endpoints::health()).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
