//! Redundant dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Rewritten path + headers + body
//!     → dispatcher.rs (N identical upstream calls, joined)
//!     → DuplicateResult (instances 1..N in dispatch order)
//!     → reconciler.rs (merge JSON, or relay instance 1)
//!     → ClientResponse
//! ```

pub mod dispatcher;
pub mod reconciler;

pub use dispatcher::{DispatchEntry, DuplicateDispatcher, DuplicateResult};
pub use reconciler::{reconcile, ClientResponse};
