//! HTTP routes

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health};
use crate::state::AppState;

/// Create the responder's router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Health check routes (not part of the auth protocol)
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .with_state(state.clone());

    // The protocol endpoint the proxy queries
    let auth_routes = Router::new()
        .route("/auth", get(auth::authenticate))
        .with_state(state);

    Router::new()
        .merge(auth_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
}
