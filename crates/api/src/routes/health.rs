//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::state::AppState;

pub const HEALTH_PATH: &str = "/health";

/// GET /health — liveness plus the number of registered senders.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = if state.registry.is_shutdown() {
        "stopping"
    } else {
        "ok"
    };

    Json(json!({
        "status": status,
        "service": "bounce-relay-api",
        "version": env!("CARGO_PKG_VERSION"),
        "senders": state.registry.len()
    }))
}
