//! server::router

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the micropub router.
///
/// Everything is served from the root path; methods other than GET and
/// POST are answered with 405 by the method router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::query).post(handlers::create))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
