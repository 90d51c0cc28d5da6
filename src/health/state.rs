//! Upstream health state.
//!
//! # States
//! - Up: forwarding allowed
//! - Down: routing may short-circuit with 503
//!
//! # State Transitions
//! ```text
//! Up → Down: any failed probe
//! Down → Up: any successful probe
//! ```
//!
//! There is no hysteresis: the latest probe result always wins.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of upstream liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthState {
    pub is_up: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl HealthState {
    /// Optimistic state held until the first probe completes.
    pub fn initial() -> Self {
        Self {
            is_up: true,
            last_checked_at: None,
        }
    }

    /// State after a probe that finished at `now`.
    ///
    /// The timestamp never moves backwards, even if the wall clock does.
    pub fn after_probe(&self, is_up: bool, now: DateTime<Utc>) -> Self {
        let checked = match self.last_checked_at {
            Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
            _ => now,
        };
        Self {
            is_up,
            last_checked_at: Some(checked),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::initial()
    }
}
