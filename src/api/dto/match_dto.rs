//! Match DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::Match;

/// A recorded match.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    /// Match id.
    pub id: Uuid,
    /// Room.
    pub room_id: Uuid,
    /// Catalog title id.
    pub movie_id: String,
    /// Likes when the match was recorded.
    pub vote_count: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Match> for MatchDto {
    fn from(m: Match) -> Self {
        Self {
            id: m.id,
            room_id: m.room_id.into(),
            movie_id: m.movie_id,
            vote_count: m.vote_count,
            created_at: m.created_at,
        }
    }
}

/// Paginated list of matches.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchListResponse {
    /// Matches on this page, newest first.
    pub data: Vec<MatchDto>,
    /// Pagination metadata.
    pub meta: PaginationMeta,
}
