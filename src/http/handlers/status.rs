use axum::extract::State;
use axum::Json;

use crate::health::HealthState;
use crate::http::server::AppState;

/// `GET /_gateway/health`
pub async fn health_status(State(state): State<AppState>) -> Json<HealthState> {
    Json(state.health.status())
}
