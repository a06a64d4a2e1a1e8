//! Swipe DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::match_dto::MatchDto;
use crate::domain::Swipe;
use crate::service::SwipeOutcome;

/// Request body for `POST /swipes`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwipeRequest {
    /// Room to vote in.
    pub room_id: Uuid,
    /// Catalog title id.
    pub movie_id: String,
    /// `true` = like.
    pub value: bool,
}

/// Request body for `DELETE /swipes`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UndoSwipeRequest {
    /// Room of the swipe.
    pub room_id: Uuid,
    /// Catalog title id.
    pub movie_id: String,
}

/// A stored swipe.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwipeDto {
    /// Swipe id.
    pub id: Uuid,
    /// Room.
    pub room_id: Uuid,
    /// Voter.
    pub user_id: Uuid,
    /// Catalog title id.
    pub movie_id: String,
    /// `true` = like.
    pub value: bool,
    /// First vote.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<Swipe> for SwipeDto {
    fn from(swipe: Swipe) -> Self {
        Self {
            id: swipe.id,
            room_id: swipe.room_id.into(),
            user_id: swipe.user_id.into(),
            movie_id: swipe.movie_id,
            value: swipe.value,
            created_at: swipe.created_at,
            updated_at: swipe.updated_at,
        }
    }
}

/// Response body for `POST /swipes` (201 Created).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SwipeResponse {
    /// The stored swipe.
    pub swipe: SwipeDto,
    /// Whether this swipe created a match.
    pub matched: bool,
    /// The match created by this swipe.
    #[serde(rename = "match")]
    pub created_match: Option<MatchDto>,
}

impl From<SwipeOutcome> for SwipeResponse {
    fn from(outcome: SwipeOutcome) -> Self {
        Self {
            swipe: outcome.swipe.into(),
            matched: outcome.created_match.is_some(),
            created_match: outcome.created_match.map(Into::into),
        }
    }
}
