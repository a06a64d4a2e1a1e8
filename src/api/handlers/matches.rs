//! Match listing.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{MatchDto, MatchListResponse, PaginationMeta, PaginationParams};
use crate::api::extract::AuthUser;
use crate::app_state::AppState;
use crate::domain::RoomId;
use crate::error::{AppError, Area, ErrorResponse};

/// `GET /matches/{roomId}`: Matches of a room, newest first.
///
/// # Errors
///
/// Returns [`AppError`] for invalid pagination, a missing room or a
/// non-member caller.
#[utoipa::path(
    get,
    path = "/api/v1/matches/{roomId}",
    tag = "Matches",
    summary = "List room matches",
    description = "Matches stay readable after the room expires.",
    security(("bearer" = [])),
    params(
        ("roomId" = Uuid, Path, description = "Room UUID"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated match list", body = MatchListResponse),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_matches(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    let (offset, limit) = params.window(Area::Matches)?;
    let page = state
        .matches
        .list_for_room(user.id, RoomId::from(room_id), offset, limit)
        .await?;
    Ok(Json(MatchListResponse {
        data: page.items.into_iter().map(MatchDto::from).collect(),
        meta: PaginationMeta::new(params, page.total),
    }))
}

/// Match routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/matches/{room_id}", get(room_matches))
}
