//! Normalized upstream responses.
//!
//! # Responsibilities
//! - Classify a response body by its declared media type
//! - Parse the body consistently with that classification
//! - Keep the received bytes so a relay is byte-exact
//!
//! # Design Decisions
//! - Content kind is derived from the body variant, never stored separately
//! - Hop-by-hop headers are dropped at construction
//! - Fields are private; an Outcome never changes after it is built

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Value};

/// Body classification of an upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Text,
    Binary,
}

/// Response body, parsed according to its [`ContentKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeBody {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

/// One upstream response, or the 503 that stands in for a failed call.
#[derive(Debug, Clone)]
pub struct Outcome {
    status: StatusCode,
    headers: HeaderMap,
    body: OutcomeBody,
    raw: Bytes,
    substitute: bool,
}

/// Headers meaningful only for a single connection.
const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
];

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

impl Outcome {
    /// Build an Outcome from a received response.
    ///
    /// Fails only when the body is declared JSON but does not parse.
    pub fn from_response(
        status: StatusCode,
        received: &HeaderMap,
        raw: Bytes,
    ) -> Result<Self, serde_json::Error> {
        let headers = normalized_headers(received);
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        let body = match classify(content_type, &raw) {
            ContentKind::Json if raw.is_empty() => OutcomeBody::Json(Value::Null),
            ContentKind::Json => OutcomeBody::Json(serde_json::from_slice(&raw)?),
            // classify only answers Text for valid UTF-8
            ContentKind::Text => OutcomeBody::Text(String::from_utf8_lossy(&raw).into_owned()),
            ContentKind::Binary => OutcomeBody::Binary(raw.clone()),
        };

        Ok(Self {
            status,
            headers,
            body,
            raw,
            substitute: false,
        })
    }

    /// Build an Outcome for a verbatim relay.
    ///
    /// Never fails: a body declared JSON that does not parse is kept as
    /// opaque bytes with its declared headers.
    pub fn relayed(status: StatusCode, received: &HeaderMap, raw: Bytes) -> Self {
        match Self::from_response(status, received, raw.clone()) {
            Ok(outcome) => outcome,
            Err(_) => Self {
                status,
                headers: normalized_headers(received),
                body: OutcomeBody::Binary(raw.clone()),
                raw,
                substitute: false,
            },
        }
    }

    /// The 503 Outcome reported in place of a failed upstream call.
    pub fn unavailable(message: &str, details: &str) -> Self {
        let value = json!({
            "error": "Service Unavailable",
            "message": message,
            "details": details,
        });
        let raw = Bytes::from(value.to_string());
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers,
            body: OutcomeBody::Json(value),
            raw,
            substitute: true,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &OutcomeBody {
        &self.body
    }

    /// Bytes exactly as received from the upstream.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn content_kind(&self) -> ContentKind {
        match self.body {
            OutcomeBody::Json(_) => ContentKind::Json,
            OutcomeBody::Text(_) => ContentKind::Text,
            OutcomeBody::Binary(_) => ContentKind::Binary,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            OutcomeBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// True when this Outcome was synthesized for a failed call.
    pub fn is_substitute(&self) -> bool {
        self.substitute
    }
}

/// Re-inserting collapses repeated names to the last value.
fn normalized_headers(received: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(received.len());
    for (name, value) in received.iter() {
        headers.insert(name.clone(), value.clone());
    }
    strip_hop_by_hop(&mut headers);
    headers
}

/// Decide the content kind of a body from its declared media type.
pub fn classify(content_type: Option<&str>, raw: &[u8]) -> ContentKind {
    let media = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if media == "application/json" || media.ends_with("+json") {
        ContentKind::Json
    } else if is_textual(&media) && std::str::from_utf8(raw).is_ok() {
        ContentKind::Text
    } else {
        ContentKind::Binary
    }
}

fn is_textual(media: &str) -> bool {
    media.starts_with("text/")
        || media.ends_with("+xml")
        || matches!(
            media,
            "application/xml" | "application/javascript" | "application/x-www-form-urlencoded"
        )
}
