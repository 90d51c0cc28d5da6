//! Response reconciliation.
//!
//! # Policy
//! ```text
//! every instance failed          → 503 {error, message, details}
//! every Outcome is JSON          → 200, merged per MergeShape
//! any Outcome is text or binary  → instance 1 relayed verbatim
//! ```
//!
//! Failed instances are replaced by their 503 substitute before merging,
//! so a partial failure still shows up in the merged body.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::config::MergeShape;
use crate::http::response::GatewayError;
use crate::redundancy::dispatcher::DuplicateResult;
use crate::upstream::{ContentKind, Outcome};

/// Tag placed in `intercepted.interceptedBy`.
pub const INTERCEPTED_BY: &str = "redundafier";

/// What the client receives for one logical request.
#[derive(Debug)]
pub enum ClientResponse {
    /// Merged JSON document, sent with 200.
    Merged(Value),
    /// A single upstream Outcome, sent byte-for-byte.
    Relayed(Outcome),
}

impl IntoResponse for ClientResponse {
    fn into_response(self) -> Response {
        match self {
            ClientResponse::Merged(value) => (StatusCode::OK, Json(value)).into_response(),
            ClientResponse::Relayed(outcome) => {
                let mut response = Response::new(Body::from(outcome.raw().clone()));
                *response.status_mut() = outcome.status();
                *response.headers_mut() = outcome.headers().clone();
                response
            }
        }
    }
}

/// Collapse a [`DuplicateResult`] into one client response.
pub fn reconcile(
    result: DuplicateResult,
    shape: MergeShape,
    failure_message: &str,
) -> Result<ClientResponse, GatewayError> {
    let entries = result.into_entries();

    if entries.iter().all(|e| e.result.is_err()) {
        let details = entries
            .iter()
            .find_map(|e| e.result.as_ref().err())
            .map(|e| e.details())
            .unwrap_or_else(|| "no upstream calls were made".to_string());
        return Err(GatewayError::unavailable(failure_message, details));
    }

    let outcomes: Vec<Outcome> = entries
        .into_iter()
        .map(|entry| match entry.result {
            Ok(outcome) => outcome,
            Err(e) => Outcome::unavailable(failure_message, &e.details()),
        })
        .collect();

    if outcomes.iter().any(|o| o.content_kind() != ContentKind::Json) {
        let first = outcomes
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::internal("reconcile called without outcomes"))?;
        return Ok(ClientResponse::Relayed(first));
    }

    let merged = match shape {
        MergeShape::Annotated => annotate(&outcomes),
        MergeShape::Bundle => bundle(&outcomes),
    };
    Ok(ClientResponse::Merged(merged))
}

/// `[{...body, instance, intercepted: {interceptedBy, timestamp}}, ...]`
fn annotate(outcomes: &[Outcome]) -> Value {
    let items = outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            let mut fields = spread(outcome.json().unwrap_or(&Value::Null));
            fields.insert(
                "intercepted".to_string(),
                json!({
                    "interceptedBy": INTERCEPTED_BY,
                    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                }),
            );
            fields.insert("instance".to_string(), json!(i + 1));
            Value::Object(fields)
        })
        .collect();
    Value::Array(items)
}

/// Object-spread semantics: objects copy their fields in order, arrays
/// and strings their indices, other scalars contribute nothing.
fn spread(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::String(text) => text
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect(),
        _ => Map::new(),
    }
}

/// `{responses: [{requestNumber, status, data}, ...]}`
fn bundle(outcomes: &[Outcome]) -> Value {
    let responses: Vec<Value> = outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            json!({
                "requestNumber": i + 1,
                "status": outcome.status().as_u16(),
                "data": outcome.json().cloned().unwrap_or(Value::Null),
            })
        })
        .collect();
    json!({ "responses": responses })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redundancy::dispatcher::DispatchEntry;
    use crate::upstream::UpstreamError;
    use axum::body::{to_bytes, Bytes};
    use axum::http::{header, HeaderMap, HeaderValue};

    fn outcome(status: StatusCode, content_type: &str, body: &'static [u8]) -> Outcome {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers.insert("x-upstream", HeaderValue::from_static("yes"));
        Outcome::from_response(status, &headers, Bytes::from_static(body)).unwrap()
    }

    fn result(outcomes: Vec<Outcome>) -> DuplicateResult {
        DuplicateResult::new(
            outcomes
                .into_iter()
                .enumerate()
                .map(|(i, o)| DispatchEntry { instance: i + 1, result: Ok(o) })
                .collect(),
        )
    }

    fn transport_error() -> UpstreamError {
        UpstreamError::InvalidPart("connection refused".into())
    }

    #[test]
    fn test_identical_json_differs_only_in_instance_and_timestamp() {
        let body = br#"{"id":5,"name":"atom"}"#;
        let merged = reconcile(
            result(vec![
                outcome(StatusCode::OK, "application/json", body),
                outcome(StatusCode::OK, "application/json", body),
            ]),
            MergeShape::Annotated,
            "failed",
        )
        .unwrap();

        let ClientResponse::Merged(Value::Array(items)) = merged else {
            panic!("expected merged array");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["instance"], 1);
        assert_eq!(items[1]["instance"], 2);
        assert_eq!(items[0]["intercepted"]["interceptedBy"], "redundafier");
        assert!(items[0]["intercepted"]["timestamp"].as_str().unwrap().ends_with('Z'));

        let strip = |v: &Value| {
            let mut v = v.clone();
            let obj = v.as_object_mut().unwrap();
            obj.remove("instance");
            obj["intercepted"].as_object_mut().unwrap().remove("timestamp");
            v
        };
        assert_eq!(strip(&items[0]), strip(&items[1]));
        assert_eq!(items[0]["id"], 5);
    }

    #[test]
    fn test_bundle_preserves_each_status() {
        let merged = reconcile(
            result(vec![
                outcome(StatusCode::OK, "application/json", br#"{"id":5}"#),
                outcome(StatusCode::NOT_FOUND, "application/json", br#"{"error":"missing"}"#),
            ]),
            MergeShape::Bundle,
            "failed",
        )
        .unwrap();

        let ClientResponse::Merged(value) = merged else {
            panic!("expected merged bundle");
        };
        assert_eq!(
            value,
            json!({"responses": [
                {"requestNumber": 1, "status": 200, "data": {"id": 5}},
                {"requestNumber": 2, "status": 404, "data": {"error": "missing"}},
            ]})
        );
    }

    #[tokio::test]
    async fn test_non_json_relays_first_instance_verbatim() {
        let first = outcome(StatusCode::ACCEPTED, "text/plain", b"first body");
        let second = outcome(StatusCode::OK, "application/json", br#"{"second":true}"#);

        let merged = reconcile(result(vec![first, second]), MergeShape::Bundle, "failed").unwrap();
        let response = merged.into_response();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"first body");
    }

    #[tokio::test]
    async fn test_binary_second_instance_still_relays_first() {
        let first = outcome(StatusCode::OK, "application/json", br#"{ "spaced" : 1 }"#);
        let second = outcome(StatusCode::OK, "image/png", b"\x89PNG");

        let response = reconcile(result(vec![first, second]), MergeShape::Annotated, "failed")
            .unwrap()
            .into_response();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), br#"{ "spaced" : 1 }"#);
    }

    #[test]
    fn test_all_failed_is_unavailable() {
        let result = DuplicateResult::new(vec![
            DispatchEntry { instance: 1, result: Err(transport_error()) },
            DispatchEntry { instance: 2, result: Err(transport_error()) },
        ]);

        let err = reconcile(result, MergeShape::Bundle, "Failed to process atoms request").unwrap_err();
        match err {
            GatewayError::UpstreamUnavailable { message, details } => {
                assert_eq!(message, "Failed to process atoms request");
                assert!(details.contains("connection refused"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_partial_failure_is_substituted() {
        let result = DuplicateResult::new(vec![
            DispatchEntry {
                instance: 1,
                result: Ok(outcome(StatusCode::OK, "application/json", br#"{"id":5}"#)),
            },
            DispatchEntry { instance: 2, result: Err(transport_error()) },
        ]);

        let ClientResponse::Merged(value) = reconcile(result, MergeShape::Bundle, "failed").unwrap() else {
            panic!("expected merged bundle");
        };
        assert_eq!(value["responses"][1]["status"], 503);
        assert_eq!(value["responses"][1]["data"]["error"], "Service Unavailable");
    }

    #[test]
    fn test_spread_of_non_objects() {
        assert_eq!(spread(&json!([1, 2])), json!({"0": 1, "1": 2}).as_object().unwrap().clone());
        assert_eq!(
            spread(&json!("ok")),
            json!({"0": "o", "1": "k"}).as_object().unwrap().clone()
        );
        assert!(spread(&json!(7)).is_empty());
        assert!(spread(&Value::Null).is_empty());
    }

    #[test]
    fn test_annotation_keeps_upstream_key_order() {
        let body = br#"{"zeta":1,"alpha":2,"mid":3}"#;
        let merged = reconcile(
            result(vec![outcome(StatusCode::OK, "application/json", body)]),
            MergeShape::Annotated,
            "failed",
        )
        .unwrap();

        let ClientResponse::Merged(Value::Array(items)) = merged else {
            panic!("expected merged array");
        };
        let keys: Vec<&str> = items[0].as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid", "intercepted", "instance"]);
    }
}
