//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Perform one round trip to the upstream
//! - Encode the request body (JSON, multipart form, raw bytes)
//! - Normalize the response into an [`Outcome`]
//! - Turn transport failures into typed errors
//!
//! # Design Decisions
//! - Non-2xx responses are data, not errors
//! - Redirects are never followed; a 3xx is relayed like any other status
//! - `send` never fails: a failed call becomes a 503 Outcome, and the
//!   body is relayed without being required to parse
//! - The multipart form is rebuilt from owned buffers on every call,
//!   so each redundant instance streams its own copy

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::upstream::outcome::{strip_hop_by_hop, Outcome};

/// One file accepted by the upload namespace.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Multipart field name the upstream expects files under.
pub const FILES_FIELD: &str = "files";

/// Request body in the form the upstream call needs.
#[derive(Debug, Clone)]
pub enum UpstreamBody {
    Empty,
    Json(Value),
    Multipart(Vec<FilePart>),
    Raw(Bytes),
}

/// A fully resolved upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

/// A response as it came off the wire.
#[derive(Debug, Clone)]
pub struct Received {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failure of a single upstream call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream declared JSON but sent an unparseable body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid multipart part: {0}")]
    InvalidPart(String),
}

impl UpstreamError {
    /// Full cause chain, used as the `details` field of a 503.
    pub fn details(&self) -> String {
        let mut text = self.to_string();
        let mut source = std::error::Error::source(self);
        // Both variants already render their source; skip the duplicate.
        if matches!(self, UpstreamError::Transport(_) | UpstreamError::InvalidJson(_)) {
            source = source.and_then(|s| s.source());
        }
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

/// Seam between the dispatcher and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one round trip, returning the response unparsed.
    async fn round_trip(&self, request: &UpstreamRequest) -> Result<Received, UpstreamError>;

    /// Perform one call, reporting transport failures and bodies declared
    /// JSON that do not parse as errors.
    async fn execute(&self, request: &UpstreamRequest) -> Result<Outcome, UpstreamError> {
        let received = self.round_trip(request).await?;
        Ok(Outcome::from_response(received.status, &received.headers, received.body)?)
    }

    /// Perform one call for a verbatim relay, absorbing failures into a
    /// 503 Outcome.
    async fn send(&self, request: &UpstreamRequest, failure_message: &str) -> Outcome {
        match self.round_trip(request).await {
            Ok(received) => Outcome::relayed(received.status, &received.headers, received.body),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Upstream call failed");
                Outcome::unavailable(failure_message, &e.details())
            }
        }
    }
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { http })
    }

    fn build_form(parts: &[FilePart]) -> Result<reqwest::multipart::Form, UpstreamError> {
        let mut form = reqwest::multipart::Form::new();
        for file in parts {
            let mut part = reqwest::multipart::Part::bytes(file.data.to_vec());
            if let Some(name) = &file.file_name {
                part = part.file_name(name.clone());
            }
            if let Some(content_type) = &file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| UpstreamError::InvalidPart(e.to_string()))?;
            }
            form = form.part(FILES_FIELD, part);
        }
        Ok(form)
    }
}

/// Header set for an upstream call: hop-by-hop, length and
/// `accept-encoding` removed, `host` pointed at the upstream.
///
/// The client does not decode compressed bodies, so the upstream is left
/// to answer with an identity encoding.
pub fn outbound_headers(headers: &HeaderMap, url: &Url) -> HeaderMap {
    let mut out = headers.clone();
    strip_hop_by_hop(&mut out);
    out.remove(header::CONTENT_LENGTH);
    out.remove(header::HOST);
    out.remove(header::ACCEPT_ENCODING);
    if let Some(host) = url.host_str() {
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&authority) {
            out.insert(header::HOST, value);
        }
    }
    out
}

#[async_trait]
impl Transport for UpstreamClient {
    async fn round_trip(&self, request: &UpstreamRequest) -> Result<Received, UpstreamError> {
        let mut headers = outbound_headers(&request.headers, &request.url);
        let sends_body = !matches!(request.method, Method::GET | Method::HEAD);

        if sends_body && matches!(request.body, UpstreamBody::Multipart(_)) {
            // reqwest sets the boundary-bearing content type itself
            headers.remove(header::CONTENT_TYPE);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);

        if sends_body {
            builder = match &request.body {
                UpstreamBody::Empty => builder,
                UpstreamBody::Json(value) => builder.json(value),
                UpstreamBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
                UpstreamBody::Raw(bytes) => builder.body(bytes.clone()),
            };
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(url = %request.url, status = %status, bytes = body.len(), "Upstream responded");

        Ok(Received { status, headers, body })
    }
}
