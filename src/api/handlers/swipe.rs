//! Swipe handlers: vote, undo, list own votes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{SwipeDto, SwipeRequest, SwipeResponse, UndoSwipeRequest};
use crate::api::extract::AuthUser;
use crate::app_state::AppState;
use crate::domain::RoomId;
use crate::error::{AppError, ErrorResponse};

/// `POST /swipes`: Record or change a vote.
///
/// # Errors
///
/// Returns [`AppError`] for an invalid movie id, a missing, expired or
/// foreign room, or an exhausted swipe limit.
#[utoipa::path(
    post,
    path = "/api/v1/swipes",
    tag = "Swipes",
    summary = "Swipe on a title",
    description = "Records the caller's like or dislike. A like that brings the title to the room's threshold creates a match, returned in `match`.",
    security(("bearer" = [])),
    request_body = SwipeRequest,
    responses(
        (status = 201, description = "Swipe recorded", body = SwipeResponse),
        (status = 400, description = "Invalid movie id", body = ErrorResponse),
        (status = 403, description = "Not a member, or swipe limit reached", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
        (status = 410, description = "Room expired", body = ErrorResponse),
    )
)]
pub async fn create_swipe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SwipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .swipes
        .swipe(user.id, RoomId::from(req.room_id), &req.movie_id, req.value)
        .await?;
    Ok((StatusCode::CREATED, Json(SwipeResponse::from(outcome))))
}

/// `DELETE /swipes`: Take a vote back.
///
/// # Errors
///
/// Returns [`AppError`] for a missing, expired or foreign room, or when
/// there is nothing to undo.
#[utoipa::path(
    delete,
    path = "/api/v1/swipes",
    tag = "Swipes",
    summary = "Undo a swipe",
    description = "Removes the caller's vote. Matches already recorded stay.",
    security(("bearer" = [])),
    request_body = UndoSwipeRequest,
    responses(
        (status = 204, description = "Swipe removed"),
        (status = 404, description = "Room or swipe not found", body = ErrorResponse),
    )
)]
pub async fn undo_swipe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UndoSwipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .swipes
        .undo(user.id, RoomId::from(req.room_id), &req.movie_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /swipes/room/{roomId}`: The caller's votes in a room.
///
/// # Errors
///
/// Returns [`AppError`] for a missing, expired or foreign room.
#[utoipa::path(
    get,
    path = "/api/v1/swipes/room/{roomId}",
    tag = "Swipes",
    summary = "List my swipes in a room",
    security(("bearer" = [])),
    params(
        ("roomId" = Uuid, Path, description = "Room UUID"),
    ),
    responses(
        (status = 200, description = "The caller's swipes", body = Vec<SwipeDto>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn my_swipes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let swipes = state
        .swipes
        .list_mine(user.id, RoomId::from(room_id))
        .await?;
    let dtos: Vec<SwipeDto> = swipes.into_iter().map(SwipeDto::from).collect();
    Ok(Json(dtos))
}

/// Swipe routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/swipes", post(create_swipe).delete(undo_swipe))
        .route("/swipes/room/{room_id}", get(my_swipes))
}
