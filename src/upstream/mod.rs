//! Upstream communication subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamRequest (method, url, headers, body)
//!     → target.rs (base URL chosen once at startup)
//!     → client.rs (one round trip through the Transport seam)
//!     → outcome.rs (status, headers, content kind, parsed body)
//! ```

pub mod client;
pub mod outcome;
pub mod target;

pub use client::{
    FilePart, Received, Transport, UpstreamBody, UpstreamClient, UpstreamError, UpstreamRequest,
};
pub use outcome::{ContentKind, Outcome, OutcomeBody};
pub use target::UpstreamTarget;
