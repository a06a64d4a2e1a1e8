//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Storage status inside [`HealthResponse`].
#[derive(Debug, Serialize, ToSchema)]
pub struct PersistenceHealth {
    /// `postgres` or `memory`.
    pub backend: String,
    /// Whether the backend answered.
    pub reachable: bool,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Check time, RFC 3339.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Storage status.
    pub persistence: PersistenceHealth,
}

/// `GET /health`: Service health status.
///
/// Always 200; an unreachable store shows as `degraded`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp and storage reachability.",
    responses(
        (status = 200, description = "Service status", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.store.backend(), "health check failed");
            false
        }
    };
    let status = if reachable { "healthy" } else { "degraded" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            persistence: PersistenceHealth {
                backend: state.store.backend().to_string(),
                reachable,
            },
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
