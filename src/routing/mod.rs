//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path
//!     → router.rs (which namespace owns it?)
//!     → rewrite.rs (upstream path + body strategy)
//!     → Return: RouteDescriptor, or no match (fallback proxy)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → RouteDescriptor (rewrite rule, merge shape, failure text)
//!     → Sort longest prefix first
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Prefixes match on whole path segments
//! - Deterministic: same input always matches same route

pub mod rewrite;
pub mod router;

pub use rewrite::{BodyStrategy, PathRewrite, RouteDescriptor};
pub use router::RouteTable;
