//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map gateway failures to HTTP status codes
//! - Render every failure as a JSON body `{error, message, details?}`
//! - Redact internal details outside development mode
//!
//! # Design Decisions
//! - Validation errors are local and never reach the upstream
//! - Upstream failures always carry the upstream-side cause in `details`
//! - Timed-out requests return 504 Gateway Timeout

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Every failure a handler can surface to the client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Malformed or missing input. Never forwarded.
    #[error("{0}")]
    Validation(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    /// The upstream could not be reached or answered nonsense.
    #[error("{message}: {details}")]
    UpstreamUnavailable { message: String, details: String },

    #[error("request took too long to process")]
    Timeout,

    /// A fault inside the gateway itself.
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    pub fn unavailable(message: impl Into<String>, details: impl Into<String>) -> Self {
        GatewayError::UpstreamUnavailable {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as a response. `development` exposes internal details.
    pub fn render(&self, development: bool) -> Response {
        let body = match self {
            GatewayError::Validation(message) => json!({
                "error": "Bad Request",
                "message": message,
            }),
            GatewayError::MethodNotAllowed(method) => json!({
                "error": "Method Not Allowed",
                "message": format!("{} is not supported on this route", method),
            }),
            GatewayError::UpstreamUnavailable { message, details } => json!({
                "error": "Service Unavailable",
                "message": message,
                "details": details,
            }),
            GatewayError::Timeout => json!({
                "error": "Gateway Timeout",
                "message": "Request took too long to process",
            }),
            GatewayError::Internal(detail) if development => json!({
                "error": "Internal Server Error",
                "message": "An unexpected error occurred",
                "details": detail,
            }),
            GatewayError::Internal(_) => json!({
                "error": "Internal Server Error",
                "message": "An unexpected error occurred",
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.render(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_shape() {
        let response = GatewayError::validation("No files uploaded").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Bad Request", "message": "No files uploaded"})
        );
    }

    #[tokio::test]
    async fn test_unavailable_carries_details() {
        let response =
            GatewayError::unavailable("Failed to process atoms request", "connection refused")
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["details"], "connection refused");
    }

    #[tokio::test]
    async fn test_internal_details_only_in_development() {
        let err = GatewayError::internal("rewrite produced garbage");

        let body = body_json(err.render(false)).await;
        assert!(body.get("details").is_none());

        let body = body_json(err.render(true)).await;
        assert_eq!(body["details"], "rewrite produced garbage");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_timeout_is_504() {
        let response = GatewayError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["error"], "Gateway Timeout");
    }
}
