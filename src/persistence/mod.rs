//! Persistence layer: the [`Store`] trait and its two backends.
//!
//! [`postgres::PostgresStore`] is the production backend on `sqlx::PgPool`.
//! [`memory::MemoryStore`] keeps the same tables in a `tokio::sync::RwLock`
//! and backs the test suite and `PERSISTENCE_ENABLED=false` deployments.
//!
//! Uniqueness (room code, member per room, swipe per user and movie, match
//! per movie) is enforced by the store itself, so concurrent requests
//! resolve through it rather than through service-level locking.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Match, NewRoom, Room, RoomId, RoomMember, Subscription, SubscriptionUpsert, Swipe, User,
    UserId,
};
use crate::error::AppError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// A slice of rows plus the total row count before slicing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Rows in the requested window.
    pub items: Vec<T>,
    /// Rows matching the query overall.
    pub total: u64,
}

/// Storage operations used by the services.
///
/// Every method returns [`AppError::Persistence`] on backend failure.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    /// Short backend name for health output.
    fn backend(&self) -> &'static str;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), AppError>;

    /// Inserts a user or, when the e-mail exists, updates the name if one
    /// is given. E-mails are matched case-insensitively.
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<User, AppError>;

    /// Loads a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Inserts a room and makes its creator the first member.
    ///
    /// Returns [`AppError::Conflict`] when the code is already taken.
    async fn create_room(&self, room: NewRoom) -> Result<Room, AppError>;

    /// Loads a room by id.
    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, AppError>;

    /// Loads a room by its (normalised) code.
    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, AppError>;

    /// Rooms `user` belongs to that have not expired at `now`, newest first.
    async fn list_rooms_for_member(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Room>, AppError>;

    /// Rooms created by `user` that have not expired at `now`.
    async fn count_active_rooms_created_by(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError>;

    /// Deletes a room with its members, swipes and matches.
    async fn delete_room(&self, id: RoomId) -> Result<bool, AppError>;

    /// Adds a member. Returns `false` if they already were one.
    async fn add_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError>;

    /// Removes a member. Returns `false` if they were not one.
    async fn remove_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError>;

    /// Returns whether `user` is a member of `room`.
    async fn is_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError>;

    /// Current member count.
    async fn count_members(&self, room: RoomId) -> Result<i64, AppError>;

    /// Members ordered by join time.
    async fn list_members(&self, room: RoomId) -> Result<Vec<RoomMember>, AppError>;

    /// Loads the swipe for (room, user, movie).
    async fn find_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
    ) -> Result<Option<Swipe>, AppError>;

    /// Creates the (room, user, movie) swipe or overwrites its value.
    async fn upsert_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
        value: bool,
    ) -> Result<Swipe, AppError>;

    /// Deletes the (room, user, movie) swipe. Returns `false` if absent.
    async fn delete_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
    ) -> Result<bool, AppError>;

    /// Positive swipes on `movie_id` in `room` by users who are still
    /// members.
    async fn count_positive_swipes(&self, room: RoomId, movie_id: &str) -> Result<i64, AppError>;

    /// Swipes `user` made in `room`.
    async fn count_user_swipes(&self, room: RoomId, user: UserId) -> Result<i64, AppError>;

    /// Swipes `user` made in `room`, oldest first.
    async fn list_user_swipes(&self, room: RoomId, user: UserId) -> Result<Vec<Swipe>, AppError>;

    /// Records a match unless (room, movie) already has one. Returns the
    /// new match, or `None` when one existed.
    async fn insert_match_if_absent(
        &self,
        room: RoomId,
        movie_id: &str,
        vote_count: i64,
    ) -> Result<Option<Match>, AppError>;

    /// Matches in `room`, newest first.
    async fn list_matches(
        &self,
        room: RoomId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Match>, AppError>;

    /// Loads the subscription of `user`.
    async fn get_subscription(&self, user: UserId) -> Result<Option<Subscription>, AppError>;

    /// Creates or replaces the subscription of `input.user_id`. Stripe ids
    /// left `None` keep their stored value.
    async fn upsert_subscription(
        &self,
        input: SubscriptionUpsert,
    ) -> Result<Subscription, AppError>;

    /// Sets `cancel_at_period_end`. Returns `None` without a subscription.
    async fn set_cancel_at_period_end(
        &self,
        user: UserId,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError>;
}
