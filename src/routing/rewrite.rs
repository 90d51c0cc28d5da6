//! Gateway-to-upstream path rewriting.
//!
//! # Rules
//! ```text
//! Fixed(p)          /api/upload/anything?x  → p
//! ReplacePrefix(u)  /api/atoms/5?populate=* → u + "/5?populate=*"
//! StripPrefix       /api/redundafier/atoms  → /atoms
//! ```
//!
//! The query string travels with the path except for fixed rewrites.

use crate::config::{MergeShape, NamespaceKind, RouteConfig};

/// How a route maps its inbound path onto the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRewrite {
    Fixed(String),
    ReplacePrefix(String),
    StripPrefix,
}

/// How a namespace builds its upstream request body. Unclaimed paths
/// always forward raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    /// Inbound multipart files re-encoded as a form.
    MultipartForm,
    /// Inbound body parsed as JSON and re-serialized.
    ParsedJson,
}

/// A compiled route. Immutable after startup.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub name: String,
    pub namespace: NamespaceKind,
    pub gateway_prefix: String,
    pub rewrite: PathRewrite,
    pub merge_shape: MergeShape,
    pub failure_message: String,
}

impl RouteDescriptor {
    pub fn from_config(config: &RouteConfig) -> Self {
        let rewrite = match (config.namespace, &config.upstream_path) {
            (NamespaceKind::Upload, Some(path)) => PathRewrite::Fixed(path.clone()),
            (NamespaceKind::Resource, Some(prefix)) => PathRewrite::ReplacePrefix(prefix.clone()),
            // validation rejects these; keep the path as-is
            (NamespaceKind::Upload | NamespaceKind::Resource, None) => {
                PathRewrite::ReplacePrefix(config.gateway_prefix.clone())
            }
            (NamespaceKind::Passthrough, _) => PathRewrite::StripPrefix,
        };

        Self {
            name: config.name.clone(),
            namespace: config.namespace,
            gateway_prefix: config.gateway_prefix.clone(),
            rewrite,
            merge_shape: config.merge_shape,
            failure_message: config.failure_message.clone(),
        }
    }

    pub fn body_strategy(&self) -> BodyStrategy {
        match self.namespace {
            NamespaceKind::Upload => BodyStrategy::MultipartForm,
            NamespaceKind::Resource | NamespaceKind::Passthrough => BodyStrategy::ParsedJson,
        }
    }

    /// True if `path` is the prefix itself or lies below it.
    pub fn matches(&self, path: &str) -> bool {
        matches_segment_prefix(path, &self.gateway_prefix)
    }

    /// Upstream path (with query) for an inbound path (with query).
    pub fn upstream_path(&self, original: &str) -> String {
        match &self.rewrite {
            PathRewrite::Fixed(path) => path.clone(),
            PathRewrite::ReplacePrefix(prefix) => {
                format!("{}{}", prefix, remainder(original, &self.gateway_prefix))
            }
            PathRewrite::StripPrefix => strip_prefix(original, &self.gateway_prefix),
        }
    }
}

/// Segment-aware prefix test: `/api/atoms` matches `/api/atoms/5`
/// but not `/api/atomsphere`.
pub fn matches_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

fn remainder<'a>(original: &'a str, prefix: &str) -> &'a str {
    original.strip_prefix(prefix).unwrap_or(original)
}

/// Drop `prefix`, leaving at least `/`.
pub fn strip_prefix(original: &str, prefix: &str) -> String {
    let rest = remainder(original, prefix);
    if rest.is_empty() || rest.starts_with('?') {
        format!("/{}", rest)
    } else {
        rest.to_string()
    }
}
