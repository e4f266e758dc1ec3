pub mod health;
pub mod notifications;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth::require_basic_auth;
use crate::state::AppState;

/// Build the complete router.
///
/// Notifications are accepted on every path and method. `GET /health` is the
/// only exception and is the one route outside the Basic auth gate; any other
/// method on `/health` still reaches the notification handler.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(notifications::handle_notification))
        .route("/{*path}", any(notifications::handle_notification))
        .route(
            health::HEALTH_PATH,
            get(health::health_check).fallback(notifications::handle_notification),
        )
        .route_layer(from_fn_with_state(state.clone(), require_basic_auth))
        .with_state(state)
}

/// [`create_router`] with the serving layers used by the binary.
pub fn create_app(state: AppState, request_timeout: Duration) -> Router {
    create_router(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}
