//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → GET upstream root (bounded redirects, short timeout)
//!     → Update state.rs
//!
//! Passive health checks (passive.rs):
//!     Forwarding failure observed
//!     → Out-of-band probe, coalesced
//!     → Update state.rs
//!
//! State (state.rs):
//!     Up ←→ Down, latest probe wins
//! ```
//!
//! # Design Decisions
//! - One monitor per process, injected into handlers through AppState
//! - Readers load an atomic snapshot and never block writers
//! - Gating on the state is advisory: it can be stale for one interval

pub mod active;
pub mod passive;
pub mod state;

pub use active::HealthMonitor;
pub use state::HealthState;
