//! Room DTOs for create, join, lookup and listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::{Room, RoomFilters, RoomMember};
use crate::service::CreateRoom;

/// Request body for `POST /rooms`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Display name (1–100 chars).
    pub name: String,
    /// Likes needed for a match; defaults to every member.
    #[serde(default)]
    pub match_threshold: Option<i32>,
    /// Candidate filters.
    #[serde(default)]
    pub filters: Option<RoomFilters>,
}

impl From<CreateRoomRequest> for CreateRoom {
    fn from(req: CreateRoomRequest) -> Self {
        Self {
            name: req.name,
            match_threshold: req.match_threshold,
            filters: req.filters.unwrap_or_default(),
        }
    }
}

/// Request body for `POST /rooms/join`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Room code, case-insensitive.
    pub code: String,
}

/// A room.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    /// Room id.
    pub id: Uuid,
    /// Join code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Creator.
    pub created_by: Uuid,
    /// Likes needed for a match, when lowered.
    pub match_threshold: Option<i32>,
    /// Candidate filters.
    pub filters: RoomFilters,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry; `null` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Room> for RoomDto {
    fn from(room: Room) -> Self {
        Self {
            id: room.id.into(),
            code: room.code,
            name: room.name,
            created_by: room.created_by.into(),
            match_threshold: room.match_threshold,
            filters: room.filters,
            created_at: room.created_at,
            expires_at: room.expires_at,
        }
    }
}

/// Response body for `GET /rooms/code/{code}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomLookupResponse {
    /// The room.
    #[serde(flatten)]
    pub room: RoomDto,
    /// Current member count.
    pub member_count: i64,
}

/// A room member.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    /// Member's user id.
    pub user_id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<RoomMember> for MemberDto {
    fn from(member: RoomMember) -> Self {
        Self {
            user_id: member.user_id.into(),
            name: member.name,
            joined_at: member.joined_at,
        }
    }
}

/// Paginated list of rooms.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomListResponse {
    /// Rooms on this page.
    pub data: Vec<RoomDto>,
    /// Pagination metadata.
    pub meta: PaginationMeta,
}
