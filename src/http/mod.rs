//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body limit)
//!     → request.rs (request ID for logs and upstream propagation)
//!     → [routing layer picks a namespace or the fallback]
//!     → handlers/ (validate, rewrite, dispatch, reconcile)
//!     → response.rs (JSON error bodies)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::{AppState, HttpServer};
