//! Passive health checking (failure-triggered probes).
//!
//! # Responsibilities
//! - Accept "a forwarding call just failed" signals from request handlers
//! - Start one out-of-band probe without blocking the caller
//!
//! # Design Decisions
//! - Fire-and-forget: the handler never waits for the probe
//! - Idempotent: triggers arriving while a probe is in flight are dropped
//! - Convergence is eventual; the request that failed is not retried

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::health::active::HealthMonitor;

impl HealthMonitor {
    /// Schedule an immediate probe unless one is already running.
    ///
    /// Returns true when this call started a probe.
    pub fn probe_now(self: &Arc<Self>) -> bool {
        if self
            .probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Health probe already in flight, trigger coalesced");
            return false;
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            monitor.probe().await;
            monitor.probe_in_flight.store(false, Ordering::Release);
        });
        true
    }
}
