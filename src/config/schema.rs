//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and inbound request settings.
    pub server: ServerConfig,

    /// Upstream target selection.
    pub upstream: UpstreamConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Redundant dispatch settings.
    pub dispatch: DispatchConfig,

    /// Namespace policy table.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            health_check: HealthCheckConfig::default(),
            timeouts: TimeoutConfig::default(),
            dispatch: DispatchConfig::default(),
            routes: default_routes(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Prefix under which every forwarded route lives.
    pub api_prefix: String,

    /// Include internal error details in responses.
    pub development: bool,

    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            api_prefix: "/api".to_string(),
            development: false,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Upstream address selection.
///
/// Exactly one of the two base URLs is used for the life of the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL used when running directly on the host.
    pub local_url: String,

    /// Base URL used when running inside a container.
    pub docker_url: String,

    /// Select `docker_url`. `IS_DOCKER_INTERNAL=true` also enables it.
    pub docker_internal: bool,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            local_url: "http://localhost:1337".to_string(),
            docker_url: "http://host.docker.internal:1337".to_string(),
            docker_internal: false,
            connect_timeout_secs: 5,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Run the periodic background probe.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Redirects a probe may follow before the upstream counts as down.
    pub max_redirects: usize,

    /// Path to probe.
    pub path: String,

    /// Reject forwarding with 503 while the upstream is down.
    pub gate_requests: bool,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            timeout_ms: 2000,
            max_redirects: 3,
            path: "/".to_string(),
            gate_requests: true,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 5 }
    }
}

/// Redundant dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of identical upstream calls per inbound request.
    pub fan_out: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { fan_out: 2 }
    }
}

/// Forwarding behavior selected by a route's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceKind {
    /// Multipart file upload re-encoded for the upstream.
    Upload,
    /// JSON resource with its prefix remapped.
    Resource,
    /// Any path, gateway prefix stripped.
    Passthrough,
}

/// Shape of the merged body when every instance answered with JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeShape {
    /// Array of bodies, each tagged with `instance` and `intercepted`.
    Annotated,
    /// `{ responses: [{ requestNumber, status, data }] }`.
    Bundle,
}

/// Route configuration mapping a gateway prefix onto a namespace.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Forwarding behavior.
    pub namespace: NamespaceKind,

    /// Gateway-facing prefix (e.g., "/api/atoms").
    pub gateway_prefix: String,

    /// Upload: fixed upstream path. Resource: upstream prefix replacing
    /// `gateway_prefix`. Ignored for passthrough.
    #[serde(default)]
    pub upstream_path: Option<String>,

    /// Merged body shape for all-JSON results.
    pub merge_shape: MergeShape,

    /// `message` reported when the upstream cannot be reached.
    pub failure_message: String,
}

/// Routes served when the config file names none.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            name: "upload".to_string(),
            namespace: NamespaceKind::Upload,
            gateway_prefix: "/api/upload".to_string(),
            upstream_path: Some("/api/upload".to_string()),
            merge_shape: MergeShape::Annotated,
            failure_message: "Failed to process upload request".to_string(),
        },
        RouteConfig {
            name: "atoms".to_string(),
            namespace: NamespaceKind::Resource,
            gateway_prefix: "/api/atoms".to_string(),
            upstream_path: Some("/api/atoms".to_string()),
            merge_shape: MergeShape::Bundle,
            failure_message: "Failed to process atoms request".to_string(),
        },
        RouteConfig {
            name: "redundafier".to_string(),
            namespace: NamespaceKind::Passthrough,
            gateway_prefix: "/api/redundafier".to_string(),
            upstream_path: None,
            merge_shape: MergeShape::Bundle,
            failure_message: "Failed to process redundafier request".to_string(),
        },
    ]
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "redundafier=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
