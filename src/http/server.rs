//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router for the API prefix and the gateway endpoints
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Build the shared state: routes, health monitor, dispatcher
//! - Serve until the shutdown coordinator fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::health::HealthMonitor;
use crate::http::handlers::{self, fallback, status};
use crate::http::request::{request_id_of, MakeRequestUuid};
use crate::http::response::GatewayError;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::redundancy::DuplicateDispatcher;
use crate::resilience::timeouts::enforce_request_timeout;
use crate::routing::RouteTable;
use crate::upstream::target::docker_flag_from_env;
use crate::upstream::{Transport, UpstreamClient, UpstreamTarget};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub routes: Arc<RouteTable>,
    pub health: Arc<HealthMonitor>,
    pub dispatcher: Arc<DuplicateDispatcher>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// Build state against the real upstream client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = UpstreamClient::new(Duration::from_secs(config.upstream.connect_timeout_secs))
            .map_err(|e| GatewayError::internal(format!("failed to build upstream client: {}", e)))?;
        Self::with_transport(config, Arc::new(client))
    }

    /// Build state around any [`Transport`].
    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, GatewayError> {
        let target = UpstreamTarget::resolve(&config.upstream, docker_flag_from_env())?;
        let health = HealthMonitor::new(target.base(), config.health_check.clone())
            .map_err(|e| GatewayError::internal(format!("failed to build health client: {}", e)))?;
        let dispatcher = DuplicateDispatcher::new(transport.clone(), target, config.dispatch.fan_out);

        tracing::info!(
            upstream = %dispatcher.target().base(),
            fan_out = dispatcher.fan_out(),
            "Upstream resolved"
        );

        Ok(Self {
            routes: Arc::new(RouteTable::from_config(&config)),
            config: Arc::new(config),
            health: Arc::new(health),
            dispatcher: Arc::new(dispatcher),
            transport,
        })
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let api_prefix = state.routes.api_prefix().to_string();
        let timeout = Duration::from_secs(state.config.timeouts.request_secs);
        let body_limit = state.config.server.max_body_bytes;

        Router::new()
            .route(&api_prefix, any(api_handler))
            .route(&format!("{}/{{*path}}", api_prefix), any(api_handler))
            .route("/_gateway/health", get(status::health_status))
            .with_state(state)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(middleware::from_fn_with_state(timeout, enforce_request_timeout))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api_prefix = %self.state.routes.api_prefix(),
            "HTTP server starting"
        );

        let monitor = self.state.health.clone();
        let health_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            monitor.run(health_shutdown).await;
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Entry point for everything under the API prefix.
async fn api_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id_of(request.headers());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let route = state.routes.classify(&path).cloned();
    let route_name = route
        .as_ref()
        .map(|r| r.name.clone())
        .unwrap_or_else(|| "fallback".to_string());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route_name,
        "Handling request"
    );

    let result = match &route {
        Some(route) => handlers::forward(&state, route, request).await,
        None => fallback::handle(&state, request).await,
    };

    let response = match result {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            match &e {
                GatewayError::Validation(_) | GatewayError::MethodNotAllowed(_) => {
                    tracing::debug!(request_id = %request_id, route = %route_name, error = %e, "Request rejected");
                }
                _ => {
                    tracing::error!(request_id = %request_id, route = %route_name, error = %e, "Request failed");
                }
            }
            e.render(state.config.server.development)
        }
    };

    metrics::record_request(&method, response.status().as_u16(), &route_name, start_time);
    response
}
