//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → timeouts.rs (whole-request deadline, 504 on expiry)
//! ```
//!
//! Redundant dispatch is deliberately not a retry mechanism and lives in
//! `redundancy`; the probe timeout lives with the health monitor.

pub mod timeouts;
