//! JSON resource and passthrough namespaces.
//!
//! Only a small, fixed header set is forwarded. The body is parsed here so
//! malformed JSON is answered locally instead of being sent N times.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request};
use serde_json::{Map, Value};

use crate::http::handlers::LogicalRequest;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::GatewayError;
use crate::http::server::AppState;
use crate::upstream::UpstreamBody;

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Accept, Content-Type, plus Authorization and request id when present.
fn resource_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, APPLICATION_JSON);
    headers.insert(header::CONTENT_TYPE, APPLICATION_JSON);
    if let Some(auth) = inbound.get(header::AUTHORIZATION) {
        headers.insert(header::AUTHORIZATION, auth.clone());
    }
    if let Some(id) = inbound.get(&X_REQUEST_ID) {
        headers.insert(X_REQUEST_ID, id.clone());
    }
    headers
}

/// Empty bodies become `{}`.
pub(crate) fn parse_json_body(bytes: &[u8]) -> Result<Value, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        GatewayError::validation("Invalid JSON body")
    })
}

pub async fn prepare(
    state: &AppState,
    upstream_path: String,
    request: Request<Body>,
) -> Result<LogicalRequest, GatewayError> {
    let method = request.method().clone();
    if method != Method::GET && method != Method::POST {
        return Err(GatewayError::MethodNotAllowed(method));
    }

    let headers = resource_headers(request.headers());

    let body = if method == Method::GET {
        UpstreamBody::Empty
    } else {
        let bytes = to_bytes(request.into_body(), state.config.server.max_body_bytes)
            .await
            .map_err(|_| GatewayError::validation("Invalid request body"))?;
        UpstreamBody::Json(parse_json_body(&bytes)?)
    };

    Ok(LogicalRequest {
        method,
        upstream_path,
        headers,
        body,
    })
}
