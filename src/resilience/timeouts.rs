//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the total time spent on one inbound request
//! - Answer 504 Gateway Timeout when the bound is exceeded
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the handler future is dropped on expiry
//! - Upstream calls in flight are cancelled with it

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::GatewayError;

/// Middleware for `axum::middleware::from_fn_with_state(limit, ..)`.
pub async fn enforce_request_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(path = %path, timeout_ms = limit.as_millis() as u64, "Request timeout");
            GatewayError::Timeout.into_response()
        }
    }
}
