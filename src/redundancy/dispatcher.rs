//! Redundant request dispatch.
//!
//! # Responsibilities
//! - Resolve the upstream URL for a rewritten path
//! - Issue N identical calls concurrently
//! - Collect every result, numbered in dispatch order
//!
//! # Design Decisions
//! - Redundancy, not retry: all calls start together
//! - No short-circuiting: one failure never cancels the others
//! - Numbering follows dispatch order, never completion order

use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use futures_util::future::join_all;

use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::upstream::{Outcome, Transport, UpstreamBody, UpstreamError, UpstreamRequest, UpstreamTarget};

/// Result of one dispatched instance.
#[derive(Debug)]
pub struct DispatchEntry {
    /// 1-based position in dispatch order.
    pub instance: usize,
    pub result: Result<Outcome, UpstreamError>,
}

/// All instances of one logical request, ordered by instance number.
#[derive(Debug)]
pub struct DuplicateResult {
    entries: Vec<DispatchEntry>,
}

impl DuplicateResult {
    pub fn new(entries: Vec<DispatchEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DispatchEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<DispatchEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if any instance failed below HTTP.
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.result.is_err())
    }
}

/// Sends every logical request `fan_out` times.
pub struct DuplicateDispatcher {
    transport: Arc<dyn Transport>,
    target: UpstreamTarget,
    fan_out: usize,
}

impl DuplicateDispatcher {
    pub fn new(transport: Arc<dyn Transport>, target: UpstreamTarget, fan_out: usize) -> Self {
        Self {
            transport,
            target,
            fan_out: fan_out.max(1),
        }
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    /// Dispatch `fan_out` identical calls and wait for all of them.
    ///
    /// Only an unusable rewritten URL fails the whole dispatch.
    pub async fn dispatch(
        &self,
        path: &str,
        headers: HeaderMap,
        body: UpstreamBody,
        method: Method,
    ) -> Result<DuplicateResult, GatewayError> {
        let url = self.target.url_for(path)?;
        let request = UpstreamRequest {
            method,
            url,
            headers,
            body,
        };

        tracing::debug!(
            url = %request.url,
            method = %request.method,
            fan_out = self.fan_out,
            "Dispatching redundant requests"
        );

        let calls = (1..=self.fan_out).map(|instance| {
            let request = &request;
            let transport = &self.transport;
            async move {
                let result = transport.execute(request).await;
                match &result {
                    Ok(outcome) => {
                        metrics::record_upstream_call(instance, Some(outcome.status().as_u16()));
                        tracing::debug!(instance, status = %outcome.status(), "Instance completed");
                    }
                    Err(e) => {
                        metrics::record_upstream_call(instance, None);
                        tracing::warn!(instance, url = %request.url, error = %e, "Instance failed");
                    }
                }
                DispatchEntry { instance, result }
            }
        });

        // join_all yields results in input order regardless of completion order
        Ok(DuplicateResult::new(join_all(calls).await))
    }
}
