//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe the upstream root
//! - Publish the result as an atomic [`HealthState`] snapshot
//! - Serve non-blocking reads of the last known state

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time;
use url::Url;

use crate::config::HealthCheckConfig;
use crate::health::state::HealthState;
use crate::observability::metrics;

pub struct HealthMonitor {
    pub(crate) state: ArcSwap<HealthState>,
    pub(crate) probe_in_flight: AtomicBool,
    client: reqwest::Client,
    probe_url: Url,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    /// Build a monitor probing `config.path` on `base`.
    pub fn new(base: &Url, config: HealthCheckConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent("redundafier-health-check")
            .no_proxy()
            .build()?;

        // A path that fails to join falls back to the root.
        let probe_url = base.join(&config.path).unwrap_or_else(|_| base.clone());

        Ok(Self {
            state: ArcSwap::from_pointee(HealthState::initial()),
            probe_in_flight: AtomicBool::new(false),
            client,
            probe_url,
            config,
        })
    }

    /// Last known state. Never waits on an in-flight probe.
    pub fn status(&self) -> HealthState {
        self.state.load().as_ref().clone()
    }

    pub fn is_up(&self) -> bool {
        self.state.load().is_up
    }

    /// Probe once and record the result.
    pub async fn probe(&self) -> HealthState {
        let is_up = match self.client.get(self.probe_url.clone()).send().await {
            Ok(response) => {
                let up = response.status().as_u16() < 500;
                if !up {
                    tracing::warn!(url = %self.probe_url, status = %response.status(), "Health probe failed: server error");
                }
                up
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(url = %self.probe_url, "Health probe failed: timeout");
                false
            }
            Err(e) if e.is_redirect() => {
                tracing::warn!(url = %self.probe_url, error = %e, "Health probe failed: too many redirects");
                false
            }
            Err(e) => {
                tracing::warn!(url = %self.probe_url, error = %e, "Health probe failed: connection error");
                false
            }
        };

        self.record(is_up)
    }

    fn record(&self, is_up: bool) -> HealthState {
        let now = Utc::now();
        let previous = self
            .state
            .rcu(|prev| Arc::new(prev.after_probe(is_up, now)));
        let next = previous.after_probe(is_up, now);

        if previous.is_up != is_up {
            tracing::info!(is_up, url = %self.probe_url, "Upstream health changed");
        }
        metrics::record_upstream_health(is_up);
        next
    }

    /// Probe on a fixed period until shutdown. The first probe runs at once.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Periodic health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            url = %self.probe_url,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
