//! Swipe recording and the swipe → match step.

use std::sync::Arc;

use super::{MatchService, NotificationService, RoomService, SubscriptionService};
use crate::domain::plan::{self, Limit};
use crate::domain::{Match, RoomId, Swipe, UserId};
use crate::error::{AppError, Area};
use crate::persistence::Store;

const MAX_MOVIE_ID_LEN: usize = 64;

/// Result of [`SwipeService::swipe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeOutcome {
    /// The stored swipe.
    pub swipe: Swipe,
    /// The match this swipe created, if any.
    pub created_match: Option<Match>,
}

/// Records votes and triggers match detection.
#[derive(Debug, Clone)]
pub struct SwipeService {
    store: Arc<dyn Store>,
    rooms: RoomService,
    subscriptions: SubscriptionService,
    matches: MatchService,
    notifications: NotificationService,
}

impl SwipeService {
    /// Creates a new `SwipeService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        rooms: RoomService,
        subscriptions: SubscriptionService,
        matches: MatchService,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            rooms,
            subscriptions,
            matches,
            notifications,
        }
    }

    /// Records the caller's vote on `movie_id`, then checks for a match
    /// when the vote is positive.
    ///
    /// A new swipe counts against the room owner's swipe limit; changing
    /// an existing vote does not. Negative votes never remove matches.
    /// The limit is checked by counting before the insert, so concurrent
    /// new swipes from one user may overshoot it by the number of racing
    /// requests.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for an empty or oversized movie id.
    /// - [`AppError::NotFound`], [`AppError::Gone`] or
    ///   [`AppError::Forbidden`] for unknown, expired or foreign rooms.
    /// - [`AppError::LimitExceeded`] when the swipe limit is reached.
    pub async fn swipe(
        &self,
        user: UserId,
        room_id: RoomId,
        movie_id: &str,
        value: bool,
    ) -> Result<SwipeOutcome, AppError> {
        let movie_id = validate_movie_id(movie_id)?;
        let room = self
            .rooms
            .active_room_for_member(room_id, user, Area::Swipes)
            .await?;

        if self.store.find_swipe(room.id, user, movie_id).await?.is_none() {
            let owner_plan = self.subscriptions.effective_plan(room.created_by).await?;
            let used = self.store.count_user_swipes(room.id, user).await?;
            plan::ensure_within(owner_plan, Limit::SwipesPerRoom, used, Area::Swipes)?;
        }

        let swipe = self.store.upsert_swipe(room.id, user, movie_id, value).await?;
        tracing::debug!(%room_id, user_id = %user, movie_id, value, "swipe recorded");

        let created_match = if value {
            self.matches.detect(&room, movie_id).await?
        } else {
            None
        };
        if let Some(m) = &created_match {
            self.notifications.match_created(&room, m);
        }

        Ok(SwipeOutcome {
            swipe,
            created_match,
        })
    }

    /// Removes the caller's vote on `movie_id`.
    ///
    /// # Errors
    ///
    /// Returns the room errors of [`SwipeService::swipe`], or
    /// [`AppError::NotFound`] when there is no such swipe.
    pub async fn undo(&self, user: UserId, room_id: RoomId, movie_id: &str) -> Result<(), AppError> {
        let movie_id = validate_movie_id(movie_id)?;
        let room = self
            .rooms
            .active_room_for_member(room_id, user, Area::Swipes)
            .await?;
        if !self.store.delete_swipe(room.id, user, movie_id).await? {
            return Err(AppError::not_found(
                Area::Swipes,
                format!("no swipe on {movie_id} in room {room_id}"),
            ));
        }
        tracing::debug!(%room_id, user_id = %user, movie_id, "swipe removed");
        Ok(())
    }

    /// The caller's swipes in a room, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn list_mine(&self, user: UserId, room_id: RoomId) -> Result<Vec<Swipe>, AppError> {
        let room = self
            .rooms
            .room_for_member(room_id, user, Area::Swipes)
            .await?;
        self.store.list_user_swipes(room.id, user).await
    }
}

fn validate_movie_id(movie_id: &str) -> Result<&str, AppError> {
    let movie_id = movie_id.trim();
    if movie_id.is_empty() || movie_id.len() > MAX_MOVIE_ID_LEN {
        return Err(AppError::invalid(
            Area::Swipes,
            format!("movieId must be between 1 and {MAX_MOVIE_ID_LEN} characters"),
        ));
    }
    Ok(movie_id)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{NewRoom, Room, RoomFilters};
    use crate::persistence::MemoryStore;
    use crate::service::CreateRoom;
    use chrono::{Duration, Utc};

    struct Fixture {
        store: Arc<dyn Store>,
        rooms: RoomService,
        swipes: SwipeService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let subscriptions = SubscriptionService::new(Arc::clone(&store), None);
        let rooms = RoomService::new(Arc::clone(&store), subscriptions.clone(), 6);
        let matches = MatchService::new(Arc::clone(&store), rooms.clone());
        let notifications = NotificationService::new(
            Arc::clone(&store),
            subscriptions.clone(),
            None,
            "noreply@swipe.movie",
            "http://localhost:3001",
        );
        let swipes = SwipeService::new(
            Arc::clone(&store),
            rooms.clone(),
            subscriptions,
            matches,
            notifications,
        );
        Fixture {
            store,
            rooms,
            swipes,
        }
    }

    async fn user(f: &Fixture, email: &str) -> UserId {
        let Ok(user) = f.store.upsert_user(email, None).await else {
            panic!("user should be created");
        };
        user.id
    }

    async fn room_with(f: &Fixture, members: usize, threshold: Option<i32>) -> (Room, Vec<UserId>) {
        let owner = user(f, "owner@example.com").await;
        let Ok(room) = f
            .rooms
            .create(
                owner,
                CreateRoom {
                    name: "Friday".to_string(),
                    match_threshold: threshold,
                    ..CreateRoom::default()
                },
            )
            .await
        else {
            panic!("room should be created");
        };
        let mut users = vec![owner];
        for i in 1..members {
            let guest = user(f, &format!("guest{i}@example.com")).await;
            let _ = f.rooms.join(guest, &room.code).await;
            users.push(guest);
        }
        (room, users)
    }

    #[tokio::test]
    async fn unanimous_likes_create_one_match() {
        let f = fixture();
        let (room, users) = room_with(&f, 3, None).await;
        let [a, b, c] = users.as_slice() else {
            panic!("three members expected");
        };

        for voter in [a, b] {
            let Ok(outcome) = f.swipes.swipe(*voter, room.id, "tt1", true).await else {
                panic!("swipe should succeed");
            };
            assert!(outcome.created_match.is_none());
        }
        let Ok(outcome) = f.swipes.swipe(*c, room.id, "tt1", true).await else {
            panic!("swipe should succeed");
        };
        let Some(m) = outcome.created_match else {
            panic!("third like should match");
        };
        assert_eq!(m.vote_count, 3);
        assert_eq!(m.movie_id, "tt1");

        let Ok(again) = f.swipes.swipe(*c, room.id, "tt1", true).await else {
            panic!("swipe should succeed");
        };
        assert!(again.created_match.is_none());

        let _ = f.swipes.swipe(*a, room.id, "tt1", false).await;
        let Ok(page) = f.store.list_matches(room.id, 0, 10).await else {
            panic!("listing should succeed");
        };
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn lower_threshold_matches_early() {
        let f = fixture();
        let (room, users) = room_with(&f, 3, Some(2)).await;
        let [a, b, _] = users.as_slice() else {
            panic!("three members expected");
        };
        let _ = f.swipes.swipe(*a, room.id, "550", true).await;
        let Ok(outcome) = f.swipes.swipe(*b, room.id, "550", true).await else {
            panic!("swipe should succeed");
        };
        assert_eq!(outcome.created_match.map(|m| m.vote_count), Some(2));
    }

    #[tokio::test]
    async fn departed_member_likes_do_not_count() {
        let f = fixture();
        let (room, users) = room_with(&f, 3, None).await;
        let [a, b, c] = users.as_slice() else {
            panic!("three members expected");
        };
        let _ = f.swipes.swipe(*b, room.id, "tt1", true).await;
        assert!(f.rooms.leave(*b, room.id).await.is_ok());

        // Two members remain; the departed like must not complete the pair.
        let Ok(outcome) = f.swipes.swipe(*a, room.id, "tt1", true).await else {
            panic!("swipe should succeed");
        };
        assert!(outcome.created_match.is_none());
        let Ok(outcome) = f.swipes.swipe(*c, room.id, "tt1", true).await else {
            panic!("swipe should succeed");
        };
        assert_eq!(outcome.created_match.map(|m| m.vote_count), Some(2));
    }

    #[tokio::test]
    async fn dislikes_never_match() {
        let f = fixture();
        let (room, users) = room_with(&f, 1, None).await;
        let Some(owner) = users.first() else {
            panic!("owner expected");
        };
        let Ok(outcome) = f.swipes.swipe(*owner, room.id, "550", false).await else {
            panic!("swipe should succeed");
        };
        assert!(outcome.created_match.is_none());
        assert!(!outcome.swipe.value);
    }

    #[tokio::test]
    async fn non_member_is_forbidden() {
        let f = fixture();
        let (room, _) = room_with(&f, 1, None).await;
        let stranger = user(&f, "stranger@example.com").await;
        assert!(matches!(
            f.swipes.swipe(stranger, room.id, "550", true).await,
            Err(AppError::Forbidden { .. })
        ));
        assert!(matches!(
            f.swipes.swipe(stranger, RoomId::new(), "550", true).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_movie_id_is_invalid() {
        let f = fixture();
        let (room, users) = room_with(&f, 1, None).await;
        let Some(owner) = users.first() else {
            panic!("owner expected");
        };
        assert!(matches!(
            f.swipes.swipe(*owner, room.id, "  ", true).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn expired_room_is_gone() {
        let f = fixture();
        let owner = user(&f, "owner@example.com").await;
        let Ok(room) = f
            .store
            .create_room(NewRoom {
                code: "ABC234".to_string(),
                name: "Old".to_string(),
                created_by: owner,
                match_threshold: None,
                filters: RoomFilters::default(),
                created_at: Utc::now() - Duration::days(2),
                expires_at: Some(Utc::now() - Duration::hours(1)),
            })
            .await
        else {
            panic!("room should be created");
        };
        assert!(matches!(
            f.swipes.swipe(owner, room.id, "550", true).await,
            Err(AppError::Gone { .. })
        ));
    }

    #[tokio::test]
    async fn swipe_limit_counts_new_swipes_only() {
        let f = fixture();
        let (room, users) = room_with(&f, 2, None).await;
        let Some(guest) = users.get(1) else {
            panic!("guest expected");
        };
        for i in 0..50 {
            assert!(
                f.swipes
                    .swipe(*guest, room.id, &format!("m{i}"), false)
                    .await
                    .is_ok()
            );
        }
        assert!(matches!(
            f.swipes.swipe(*guest, room.id, "m50", false).await,
            Err(AppError::LimitExceeded { .. })
        ));
        assert!(f.swipes.swipe(*guest, room.id, "m0", true).await.is_ok());
    }

    #[tokio::test]
    async fn undo_and_list() {
        let f = fixture();
        let (room, users) = room_with(&f, 2, None).await;
        let Some(owner) = users.first() else {
            panic!("owner expected");
        };
        let _ = f.swipes.swipe(*owner, room.id, "550", true).await;
        let _ = f.swipes.swipe(*owner, room.id, "551", false).await;
        assert_eq!(
            f.swipes.list_mine(*owner, room.id).await.map(|s| s.len()).ok(),
            Some(2)
        );
        assert!(f.swipes.undo(*owner, room.id, "550").await.is_ok());
        assert!(matches!(
            f.swipes.undo(*owner, room.id, "550").await,
            Err(AppError::NotFound { .. })
        ));
        assert_eq!(
            f.swipes.list_mine(*owner, room.id).await.map(|s| s.len()).ok(),
            Some(1)
        );
    }
}
