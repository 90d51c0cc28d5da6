//! Upstream base URL resolution.
//!
//! The base URL is chosen once, at startup, between the two configured
//! addresses. Every forwarded path is appended to it.

use url::Url;

use crate::config::UpstreamConfig;
use crate::http::response::GatewayError;

/// Environment flag selecting the container-internal upstream address.
pub const DOCKER_FLAG_ENV: &str = "IS_DOCKER_INTERNAL";

/// Read the docker flag from the environment. Only `"true"` enables it.
pub fn docker_flag_from_env() -> bool {
    std::env::var(DOCKER_FLAG_ENV)
        .map(|v| v == "true")
        .unwrap_or(false)
}

/// The resolved upstream base.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    base: Url,
}

impl UpstreamTarget {
    /// Pick the base URL. `docker_flag` ORs with the config switch.
    pub fn resolve(config: &UpstreamConfig, docker_flag: bool) -> Result<Self, GatewayError> {
        let raw = if config.docker_internal || docker_flag {
            &config.docker_url
        } else {
            &config.local_url
        };
        let base = Url::parse(raw).map_err(|e| {
            GatewayError::internal(format!("invalid upstream base URL '{}': {}", raw, e))
        })?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Join a rewritten path (with optional query) onto the base.
    pub fn url_for(&self, path: &str) -> Result<Url, GatewayError> {
        let base = self.base.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };
        Url::parse(&joined)
            .map_err(|e| GatewayError::internal(format!("rewritten URL '{}' is invalid: {}", joined, e)))
    }
}
