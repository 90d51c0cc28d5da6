//! Namespace classification.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Classify an inbound path into a namespace route
//! - Rewrite unclaimed API paths for the fallback proxy
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan over a handful of routes
//! - Explicit no-match rather than silent default

use crate::config::GatewayConfig;
use crate::routing::rewrite::{strip_prefix, RouteDescriptor};

/// Compiled route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    api_prefix: String,
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut routes: Vec<RouteDescriptor> =
            config.routes.iter().map(RouteDescriptor::from_config).collect();
        // longest prefix first so nested prefixes resolve to the deepest route
        routes.sort_by(|a, b| b.gateway_prefix.len().cmp(&a.gateway_prefix.len()));

        Self {
            api_prefix: config.server.api_prefix.trim_end_matches('/').to_string(),
            routes,
        }
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// The namespace route owning `path`, if any.
    pub fn classify(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|route| route.matches(path))
    }

    /// Upstream path for the fallback proxy: the API prefix removed.
    pub fn fallback_path(&self, original: &str) -> String {
        strip_prefix(original, &self.api_prefix)
    }
}
