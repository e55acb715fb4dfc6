//! HTTP routes.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::TokenService;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
pub struct AppState {
    /// Token lifecycle core.
    pub token_service: TokenService,

    /// Deadline applied to every issue/rotate call.
    pub request_deadline: Duration,
}

/// Build the application routes.
///
/// - `POST /api/v1/token` - issue a token pair
/// - `POST /api/v1/token/refresh` - rotate a token pair
/// - `GET /token/:user_id`, `POST /refresh` - legacy aliases of the above
/// - `/health`, `/ready`, `/metrics` - operational endpoints
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let token_routes = Router::new()
        .route("/api/v1/token", post(handlers::handle_issue))
        .route("/api/v1/token/refresh", post(handlers::handle_refresh))
        .route("/token/:user_id", get(handlers::handle_issue_for_user))
        .route("/refresh", post(handlers::handle_refresh))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    token_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        // Outermost so framework-level rejections are counted too
        .layer(middleware::from_fn(http_metrics_middleware))
}
