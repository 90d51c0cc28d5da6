//! Single-shot proxy for API paths no namespace claims.
//!
//! The API prefix is stripped and the request is forwarded once with its
//! body and headers untouched. The upstream answer is relayed verbatim.

use axum::body::{to_bytes, Body};
use axum::http::Request;

use crate::http::handlers::{ensure_upstream_up, path_and_query, LogicalRequest};
use crate::http::response::GatewayError;
use crate::http::server::AppState;
use crate::redundancy::ClientResponse;
use crate::upstream::{UpstreamBody, UpstreamRequest};

pub const FALLBACK_FAILURE_MESSAGE: &str = "Failed to proxy request to target server";

/// Raw body and inbound headers, unchanged.
pub async fn prepare(
    state: &AppState,
    upstream_path: String,
    request: Request<Body>,
) -> Result<LogicalRequest, GatewayError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|_| GatewayError::validation("Invalid request body"))?;

    Ok(LogicalRequest {
        method: parts.method,
        upstream_path,
        headers: parts.headers,
        body: if bytes.is_empty() {
            UpstreamBody::Empty
        } else {
            UpstreamBody::Raw(bytes)
        },
    })
}

pub async fn handle(state: &AppState, request: Request<Body>) -> Result<ClientResponse, GatewayError> {
    let upstream_path = state.routes.fallback_path(&path_and_query(&request));
    let logical = prepare(state, upstream_path, request).await?;

    ensure_upstream_up(state, FALLBACK_FAILURE_MESSAGE)?;

    let url = state.dispatcher.target().url_for(&logical.upstream_path)?;
    tracing::debug!(url = %url, method = %logical.method, "Proxying unclaimed path");

    let outcome = state
        .transport
        .send(
            &UpstreamRequest {
                method: logical.method,
                url,
                headers: logical.headers,
                body: logical.body,
            },
            FALLBACK_FAILURE_MESSAGE,
        )
        .await;

    if outcome.is_substitute() {
        state.health.probe_now();
    }
    Ok(ClientResponse::Relayed(outcome))
}
