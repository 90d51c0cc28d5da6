//! Namespace handlers.
//!
//! # Data Flow
//! ```text
//! classified request
//!     → upload.rs / resource.rs / fallback.rs (validate, rewrite, build body)
//!     → LogicalRequest
//!     → health gate
//!     → DuplicateDispatcher → reconcile → ClientResponse
//! ```

pub mod fallback;
pub mod resource;
pub mod status;
pub mod upload;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request};

use crate::http::response::GatewayError;
use crate::http::server::AppState;
use crate::redundancy::{reconcile, ClientResponse};
use crate::routing::{BodyStrategy, RouteDescriptor};
use crate::upstream::UpstreamBody;

/// One request as it will be sent to the upstream, before fan-out.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    pub method: Method,
    pub upstream_path: String,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

/// Path plus query of an inbound request.
pub(crate) fn path_and_query(request: &Request<Body>) -> String {
    request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Reject with 503 while the health monitor reports the upstream down.
pub(crate) fn ensure_upstream_up(state: &AppState, failure_message: &str) -> Result<(), GatewayError> {
    if !state.config.health_check.gate_requests {
        return Ok(());
    }
    if state.health.is_up() {
        return Ok(());
    }
    let health = state.health.status();
    let checked = health
        .last_checked_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    Err(GatewayError::unavailable(
        failure_message,
        format!("upstream health check failed (last checked {})", checked),
    ))
}

/// Run a namespace route: build, gate, fan out, reconcile.
pub async fn forward(
    state: &AppState,
    route: &RouteDescriptor,
    request: Request<Body>,
) -> Result<ClientResponse, GatewayError> {
    let upstream_path = route.upstream_path(&path_and_query(&request));
    let logical = match route.body_strategy() {
        BodyStrategy::MultipartForm => upload::prepare(upstream_path, request).await?,
        BodyStrategy::ParsedJson => resource::prepare(state, upstream_path, request).await?,
    };

    ensure_upstream_up(state, &route.failure_message)?;

    tracing::debug!(
        route = %route.name,
        upstream_path = %logical.upstream_path,
        method = %logical.method,
        "Forwarding redundantly"
    );

    let result = state
        .dispatcher
        .dispatch(&logical.upstream_path, logical.headers, logical.body, logical.method)
        .await?;

    if result.has_failures() {
        state.health.probe_now();
    }

    reconcile(result, route.merge_shape, &route.failure_message)
}
