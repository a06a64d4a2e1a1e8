//! REST API layer: route handlers, DTOs, extractors, middleware and router
//! composition.
//!
//! Resource endpoints are mounted under `/api/v1`; health and the OpenAPI
//! document live at the root.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;

use std::time::Duration;

use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete application router.
///
/// From the outside in: CORS, tracing, the error envelope, the request
/// timeout, rate limiting and panic capture wrap every route, including
/// the fallback for unknown paths.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));

    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(openapi::routes())
        .layer(CatchPanicLayer::new())
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(from_fn_with_state(state.clone(), middleware::render_errors))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
