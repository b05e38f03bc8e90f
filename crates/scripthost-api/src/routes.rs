//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    Router,
    routing::{any, get},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, invoke_script};
use crate::state::AppState;

/// Create the router.
///
/// ```text
/// GET  /health                       - Host and invocation statistics
/// ANY  /{org}/{repo}/{script}        - Invoke a script (HTTP or WebSocket upgrade)
/// ANY  /{org}/{repo}/{script}/{*rest}
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/{org}/{repo}/{script}", any(invoke_script))
        .route("/{org}/{repo}/{script}/{*rest}", any(invoke_script))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
