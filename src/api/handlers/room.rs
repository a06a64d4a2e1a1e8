//! Room handlers: create, join, list, lookup, members, leave, delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    CreateRoomRequest, JoinRoomRequest, MemberDto, PaginationMeta, PaginationParams, RoomDto,
    RoomListResponse, RoomLookupResponse,
};
use crate::api::extract::AuthUser;
use crate::app_state::AppState;
use crate::domain::RoomId;
use crate::error::{AppError, Area, ErrorResponse};

/// `POST /rooms`: Create a room and join it.
///
/// # Errors
///
/// Returns [`AppError`] for invalid input or when the caller's plan
/// does not allow another room or the requested filters.
#[utoipa::path(
    post,
    path = "/api/v1/rooms",
    tag = "Rooms",
    summary = "Create a room",
    description = "Creates a room with a fresh join code. The creator becomes its first member. Room count, advanced filters and expiry follow the creator's plan.",
    security(("bearer" = [])),
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomDto),
        (status = 400, description = "Invalid name, threshold or filters", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Plan limit reached", body = ErrorResponse),
    )
)]
pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let room = state.rooms.create(user.id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(RoomDto::from(room))))
}

/// `POST /rooms/join`: Join a room by code.
///
/// # Errors
///
/// Returns [`AppError`] for an unknown or expired code, or a full room.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/join",
    tag = "Rooms",
    summary = "Join a room",
    description = "Joins the room with the given code. Joining a room twice is a no-op.",
    security(("bearer" = [])),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined room", body = RoomDto),
        (status = 400, description = "Malformed code", body = ErrorResponse),
        (status = 403, description = "Room is full", body = ErrorResponse),
        (status = 404, description = "No room with that code", body = ErrorResponse),
        (status = 410, description = "Room expired", body = ErrorResponse),
    )
)]
pub async fn join_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let room = state.rooms.join(user.id, &req.code).await?;
    Ok(Json(RoomDto::from(room)))
}

/// `GET /rooms/my`: Rooms the caller belongs to.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for out-of-range pagination.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/my",
    tag = "Rooms",
    summary = "List my rooms",
    description = "Returns the caller's unexpired rooms, newest first.",
    security(("bearer" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated room list", body = RoomListResponse),
        (status = 400, description = "Invalid pagination", body = ErrorResponse),
    )
)]
pub async fn my_rooms(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    let (offset, limit) = params.window(Area::Rooms)?;
    let page = state.rooms.my_rooms(user.id, offset, limit).await?;
    Ok(Json(RoomListResponse {
        data: page.items.into_iter().map(RoomDto::from).collect(),
        meta: PaginationMeta::new(params, page.total),
    }))
}

/// `GET /rooms/code/{code}`: Look a room up before joining.
///
/// # Errors
///
/// Returns [`AppError`] for an unknown or expired code.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/code/{code}",
    tag = "Rooms",
    summary = "Look up a room by code",
    security(("bearer" = [])),
    params(
        ("code" = String, Path, description = "Room code, case-insensitive"),
    ),
    responses(
        (status = 200, description = "Room and member count", body = RoomLookupResponse),
        (status = 404, description = "No room with that code", body = ErrorResponse),
        (status = 410, description = "Room expired", body = ErrorResponse),
    )
)]
pub async fn room_by_code(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (room, member_count) = state.rooms.get_by_code(&code).await?;
    Ok(Json(RoomLookupResponse {
        room: room.into(),
        member_count,
    }))
}

/// `GET /rooms/{id}/members`: Members of a room.
///
/// # Errors
///
/// Returns [`AppError`] when the room is missing or the caller is not a member.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{id}/members",
    tag = "Rooms",
    summary = "List room members",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Room UUID"),
    ),
    responses(
        (status = 200, description = "Members in join order", body = Vec<MemberDto>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn room_members(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let members = state.rooms.members(user.id, RoomId::from(id)).await?;
    let dtos: Vec<MemberDto> = members.into_iter().map(MemberDto::from).collect();
    Ok(Json(dtos))
}

/// `POST /rooms/{id}/leave`: Leave a room.
///
/// # Errors
///
/// Returns [`AppError`] when the room is missing or the caller is not a member.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{id}/leave",
    tag = "Rooms",
    summary = "Leave a room",
    description = "Removes the caller's membership. Their swipes stay recorded.",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Room UUID"),
    ),
    responses(
        (status = 204, description = "Left the room"),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn leave_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.rooms.leave(user.id, RoomId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /rooms/{id}`: Delete a room.
///
/// # Errors
///
/// Returns [`AppError`] when the room is missing or the caller did not
/// create it.
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{id}",
    tag = "Rooms",
    summary = "Delete a room",
    description = "Deletes the room with its members, swipes and matches. Only the creator may do this.",
    security(("bearer" = [])),
    params(
        ("id" = Uuid, Path, description = "Room UUID"),
    ),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse),
    )
)]
pub async fn delete_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.rooms.delete(user.id, RoomId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Room routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/join", post(join_room))
        .route("/rooms/my", get(my_rooms))
        .route("/rooms/code/{code}", get(room_by_code))
        .route("/rooms/{id}/members", get(room_members))
        .route("/rooms/{id}/leave", post(leave_room))
        .route("/rooms/{id}", delete(delete_room))
}
