//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (fan-out, timeouts)
//! - Check that upstream URLs parse
//! - Detect overlapping or misplaced route prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::{GatewayConfig, NamespaceKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.dispatch.fan_out == 0 {
        errors.push(ValidationError::new("dispatch.fan_out", "must be at least 1"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::new("health_check.timeout_ms", "must be greater than 0"));
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }

    for (field, raw) in [
        ("upstream.local_url", &config.upstream.local_url),
        ("upstream.docker_url", &config.upstream.docker_url),
    ] {
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                field,
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(field, e.to_string())),
        }
    }

    let api_prefix = config.server.api_prefix.trim_end_matches('/');
    if !api_prefix.starts_with('/') {
        errors.push(ValidationError::new("server.api_prefix", "must start with '/'"));
    } else if api_prefix == "/_gateway" {
        errors.push(ValidationError::new("server.api_prefix", "'/_gateway' is reserved"));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = |name: &str| format!("routes[{}].{}", i, name);

        let under_api = route
            .gateway_prefix
            .strip_prefix(api_prefix)
            .map(|rest| rest.starts_with('/') && rest.len() > 1)
            .unwrap_or(false);
        if !under_api {
            errors.push(ValidationError::new(
                field("gateway_prefix"),
                format!("must be a sub-path of '{}'", api_prefix),
            ));
        }
        if route.gateway_prefix.ends_with('/') {
            errors.push(ValidationError::new(field("gateway_prefix"), "must not end with '/'"));
        }
        if !seen.insert(route.gateway_prefix.as_str()) {
            errors.push(ValidationError::new(field("gateway_prefix"), "duplicate prefix"));
        }

        match (route.namespace, route.upstream_path.as_deref()) {
            (NamespaceKind::Upload | NamespaceKind::Resource, None) => {
                errors.push(ValidationError::new(
                    field("upstream_path"),
                    "required for upload and resource routes",
                ));
            }
            (NamespaceKind::Upload | NamespaceKind::Resource, Some(path)) if !path.starts_with('/') => {
                errors.push(ValidationError::new(field("upstream_path"), "must start with '/'"));
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
