//! Match detection and listing.

use std::sync::Arc;

use super::RoomService;
use crate::domain::matching;
use crate::domain::{Match, Room, RoomId, UserId};
use crate::error::{AppError, Area};
use crate::persistence::{Page, Store};

/// Records matches when enough members like the same title.
#[derive(Debug, Clone)]
pub struct MatchService {
    store: Arc<dyn Store>,
    rooms: RoomService,
}

impl MatchService {
    /// Creates a new `MatchService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, rooms: RoomService) -> Self {
        Self { store, rooms }
    }

    /// Checks whether `movie_id` reached the room's threshold and records
    /// the match if so. Returns the match only when this call created it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] on store failure.
    pub async fn detect(&self, room: &Room, movie_id: &str) -> Result<Option<Match>, AppError> {
        let positive = self.store.count_positive_swipes(room.id, movie_id).await?;
        let members = self.store.count_members(room.id).await?;
        let required = matching::required_votes(members, room.match_threshold);
        if !matching::threshold_reached(positive, required) {
            tracing::debug!(room_id = %room.id, movie_id, positive, required, "no match yet");
            return Ok(None);
        }

        let created = self
            .store
            .insert_match_if_absent(room.id, movie_id, positive)
            .await?;
        if let Some(m) = &created {
            tracing::info!(room_id = %room.id, movie_id, votes = m.vote_count, "match created");
        }
        Ok(created)
    }

    /// Matches of a room the caller belongs to, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn list_for_room(
        &self,
        user: UserId,
        room_id: RoomId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Match>, AppError> {
        let room = self
            .rooms
            .room_for_member(room_id, user, Area::Matches)
            .await?;
        self.store.list_matches(room.id, offset, limit).await
    }
}
