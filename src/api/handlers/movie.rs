//! Catalog handlers: room candidates and genres.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{CandidatesQuery, GenresQuery};
use crate::api::extract::AuthUser;
use crate::app_state::AppState;
use crate::clients::{CatalogPage, Genre};
use crate::domain::RoomId;
use crate::error::{AppError, ErrorResponse};

/// `GET /movies/rooms/{roomId}/candidates`: Titles to swipe on.
///
/// # Errors
///
/// Returns [`AppError`] for an out-of-range page, a room the caller
/// cannot swipe in, or catalog failures.
#[utoipa::path(
    get,
    path = "/api/v1/movies/rooms/{roomId}/candidates",
    tag = "Movies",
    summary = "Candidate titles for a room",
    description = "One catalog page matching the room's filters, without titles the caller already swiped in that room.",
    security(("bearer" = [])),
    params(
        ("roomId" = Uuid, Path, description = "Room UUID"),
        CandidatesQuery,
    ),
    responses(
        (status = 200, description = "Catalog page", body = CatalogPage),
        (status = 400, description = "Page out of range", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 410, description = "Room expired", body = ErrorResponse),
        (status = 502, description = "Catalog failed", body = ErrorResponse),
        (status = 503, description = "Catalog not configured", body = ErrorResponse),
    )
)]
pub async fn candidates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Query(query): Query<CandidatesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .catalog
        .candidates(user.id, RoomId::from(room_id), query.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

/// `GET /movies/genres`: Catalog genres.
///
/// # Errors
///
/// Returns [`AppError`] on catalog failures.
#[utoipa::path(
    get,
    path = "/api/v1/movies/genres",
    tag = "Movies",
    summary = "List genres",
    security(("bearer" = [])),
    params(GenresQuery),
    responses(
        (status = 200, description = "Genres for the media type", body = Vec<Genre>),
        (status = 502, description = "Catalog failed", body = ErrorResponse),
        (status = 503, description = "Catalog not configured", body = ErrorResponse),
    )
)]
pub async fn genres(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<GenresQuery>,
) -> Result<impl IntoResponse, AppError> {
    let genres = state
        .catalog
        .genres(query.media_type.unwrap_or_default())
        .await?;
    Ok(Json(genres))
}

/// Catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movies/rooms/{room_id}/candidates", get(candidates))
        .route("/movies/genres", get(genres))
}
