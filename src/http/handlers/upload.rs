//! Upload namespace.
//!
//! # Responsibilities
//! - Accept only `multipart/form-data`
//! - Require at least one file part, each with a non-empty buffer
//!   under the `files` field
//! - Re-encode accepted files as a form for the fixed upstream path
//!
//! # Design Decisions
//! - Validation failures are answered locally with 400 and never forwarded
//! - The inbound multipart stream is owned by `prepare` and dropped on
//!   every return path, including mid-stream validation failures

use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{header, HeaderMap, Method, Request};

use crate::http::handlers::LogicalRequest;
use crate::http::response::GatewayError;
use crate::upstream::client::FILES_FIELD;
use crate::upstream::{FilePart, UpstreamBody};

pub const NO_FILES_UPLOADED: &str = "No files uploaded";
pub const INVALID_FILE_BUFFER: &str = "Invalid file buffer";

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case("multipart/form-data"))
        .unwrap_or(false)
}

/// Inbound headers minus those describing the inbound body.
fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    out.remove(header::CONTENT_TYPE);
    out.remove(header::CONTENT_LENGTH);
    out.remove(header::HOST);
    out.remove(header::EXPECT);
    out
}

pub async fn prepare(
    upstream_path: String,
    request: Request<Body>,
) -> Result<LogicalRequest, GatewayError> {
    if request.method() != Method::POST {
        return Err(GatewayError::MethodNotAllowed(request.method().clone()));
    }
    if !is_multipart(request.headers()) {
        return Err(GatewayError::validation(NO_FILES_UPLOADED));
    }

    let headers = forwarded_headers(request.headers());
    let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| {
        tracing::debug!(error = %e, "Rejected multipart request");
        GatewayError::validation(NO_FILES_UPLOADED)
    })?;

    let files = collect_files(&mut multipart).await?;
    tracing::debug!(files = files.len(), "Upload validated");

    Ok(LogicalRequest {
        method: Method::POST,
        upstream_path,
        headers,
        body: UpstreamBody::Multipart(files),
    })
}

/// Read every file part. Non-file fields are skipped; a file under any
/// field other than `files` is refused.
async fn collect_files(multipart: &mut Multipart) -> Result<Vec<FilePart>, GatewayError> {
    let mut files = Vec::new();
    let mut fields_seen = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // a body without a single part is "no files", not a broken buffer
            Err(e) if fields_seen == 0 => {
                tracing::debug!(error = %e, "Multipart body without parts");
                return Err(GatewayError::validation(NO_FILES_UPLOADED));
            }
            Err(e) => {
                tracing::debug!(error = %e, "Malformed multipart stream");
                return Err(GatewayError::validation(INVALID_FILE_BUFFER));
            }
        };
        fields_seen += 1;

        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if field.name() != Some(FILES_FIELD) {
            tracing::debug!(field = ?field.name(), file_name = %file_name, "File under unexpected field");
            return Err(GatewayError::validation(INVALID_FILE_BUFFER));
        }
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|_| GatewayError::validation(INVALID_FILE_BUFFER))?;

        if data.is_empty() {
            tracing::debug!(file_name = %file_name, "Empty file part");
            return Err(GatewayError::validation(INVALID_FILE_BUFFER));
        }

        files.push(FilePart {
            file_name: Some(file_name),
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(GatewayError::validation(NO_FILES_UPLOADED));
    }
    Ok(files)
}
