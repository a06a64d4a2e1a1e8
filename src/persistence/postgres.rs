//! PostgreSQL implementation of [`Store`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use super::models::{MatchRow, MemberRow, RoomRow, SubscriptionRow, SwipeRow, UserRow};
use super::{Page, Store};
use crate::config::AppConfig;
use crate::domain::{
    Match, NewRoom, Room, RoomId, RoomMember, Subscription, SubscriptionUpsert, Swipe, User,
    UserId,
};
use crate::error::{AppError, Area};

const ROOM_COLUMNS: &str =
    "r.id, r.code, r.name, r.created_by, r.match_threshold, r.filters, r.created_at, r.expires_at";

const SWIPE_COLUMNS: &str = "id, room_id, user_id, movie_id, value, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan, status, stripe_customer_id, \
     stripe_subscription_id, current_period_start, current_period_end, cancel_at_period_end, \
     created_at, updated_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings in `config` and runs the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] if the connection or a migration
    /// fails.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Persistence(format!("migration failed: {e}")))?;

        tracing::info!(
            max_connections = config.database_max_connections,
            "connected to postgres"
        );
        Ok(Self::new(pool))
    }
}

fn db_error(e: sqlx::Error) -> AppError {
    AppError::Persistence(e.to_string())
}

/// Maps unique violations to [`AppError::Conflict`] in `area`.
fn unique_or_db_error(e: sqlx::Error, area: Area) -> AppError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return AppError::conflict(area, db.message().to_string());
    }
    db_error(e)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl Store for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, name) VALUES ($1, lower($2), $3) \
             ON CONFLICT (email) DO UPDATE SET name = COALESCE(EXCLUDED.name, users.name) \
             RETURNING id, email, name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, created_at FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn create_room(&self, room: NewRoom) -> Result<Room, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "INSERT INTO rooms AS r (id, code, name, created_by, match_threshold, filters, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&room.code)
        .bind(&room.name)
        .bind(Uuid::from(room.created_by))
        .bind(room.match_threshold)
        .bind(Json(&room.filters))
        .bind(room.created_at)
        .bind(room.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_or_db_error(e, Area::Rooms))?;

        sqlx::query("INSERT INTO room_members (room_id, user_id, joined_at) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(Uuid::from(room.created_by))
            .bind(room.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_rooms_for_member(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Room>, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rooms r JOIN room_members m ON m.room_id = r.id \
             WHERE m.user_id = $1 AND (r.expires_at IS NULL OR r.expires_at > $2)",
        )
        .bind(Uuid::from(user))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r JOIN room_members m ON m.room_id = r.id \
             WHERE m.user_id = $1 AND (r.expires_at IS NULL OR r.expires_at > $2) \
             ORDER BY r.created_at DESC, r.id LIMIT $3 OFFSET $4"
        ))
        .bind(Uuid::from(user))
        .bind(now)
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total: to_u64(total),
        })
    }

    async fn count_active_rooms_created_by(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM rooms \
             WHERE created_by = $1 AND (expires_at IS NULL OR expires_at > $2)",
        )
        .bind(Uuid::from(user))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO room_members (room_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (room_id, user_id) DO NOTHING",
        )
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
            .bind(Uuid::from(room))
            .bind(Uuid::from(user))
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn count_members(&self, room: RoomId) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM room_members WHERE room_id = $1")
            .bind(Uuid::from(room))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn list_members(&self, room: RoomId) -> Result<Vec<RoomMember>, AppError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT m.room_id, m.user_id, u.name, m.joined_at FROM room_members m \
             JOIN users u ON u.id = m.user_id WHERE m.room_id = $1 ORDER BY m.joined_at, m.user_id",
        )
        .bind(Uuid::from(room))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
    ) -> Result<Option<Swipe>, AppError> {
        let row = sqlx::query_as::<_, SwipeRow>(&format!(
            "SELECT {SWIPE_COLUMNS} FROM swipes WHERE room_id = $1 AND user_id = $2 AND movie_id = $3"
        ))
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn upsert_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
        value: bool,
    ) -> Result<Swipe, AppError> {
        let row = sqlx::query_as::<_, SwipeRow>(&format!(
            "INSERT INTO swipes (id, room_id, user_id, movie_id, value) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (room_id, user_id, movie_id) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = now() \
             RETURNING {SWIPE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .bind(movie_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn delete_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM swipes WHERE room_id = $1 AND user_id = $2 AND movie_id = $3",
        )
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .bind(movie_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_positive_swipes(&self, room: RoomId, movie_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM swipes s \
             JOIN room_members m ON m.room_id = s.room_id AND m.user_id = s.user_id \
             WHERE s.room_id = $1 AND s.movie_id = $2 AND s.value",
        )
        .bind(Uuid::from(room))
        .bind(movie_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn count_user_swipes(&self, room: RoomId, user: UserId) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM swipes WHERE room_id = $1 AND user_id = $2",
        )
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn list_user_swipes(&self, room: RoomId, user: UserId) -> Result<Vec<Swipe>, AppError> {
        let rows = sqlx::query_as::<_, SwipeRow>(&format!(
            "SELECT {SWIPE_COLUMNS} FROM swipes WHERE room_id = $1 AND user_id = $2 \
             ORDER BY created_at, id"
        ))
        .bind(Uuid::from(room))
        .bind(Uuid::from(user))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_match_if_absent(
        &self,
        room: RoomId,
        movie_id: &str,
        vote_count: i64,
    ) -> Result<Option<Match>, AppError> {
        let row = sqlx::query_as::<_, MatchRow>(
            "INSERT INTO matches (id, room_id, movie_id, vote_count) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (room_id, movie_id) DO NOTHING \
             RETURNING id, room_id, movie_id, vote_count, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::from(room))
        .bind(movie_id)
        .bind(vote_count)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_matches(
        &self,
        room: RoomId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Match>, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matches WHERE room_id = $1")
            .bind(Uuid::from(room))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let rows = sqlx::query_as::<_, MatchRow>(
            "SELECT id, room_id, movie_id, vote_count, created_at FROM matches \
             WHERE room_id = $1 ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
        )
        .bind(Uuid::from(room))
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total: to_u64(total),
        })
    }

    async fn get_subscription(&self, user: UserId) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(Uuid::from(user))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Subscription::try_from).transpose()
    }

    async fn upsert_subscription(
        &self,
        input: SubscriptionUpsert,
    ) -> Result<Subscription, AppError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "INSERT INTO subscriptions (id, user_id, plan, status, stripe_customer_id, \
             stripe_subscription_id, current_period_start, current_period_end, cancel_at_period_end) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id) DO UPDATE SET \
               plan = EXCLUDED.plan, \
               status = EXCLUDED.status, \
               stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, subscriptions.stripe_customer_id), \
               stripe_subscription_id = COALESCE(EXCLUDED.stripe_subscription_id, subscriptions.stripe_subscription_id), \
               current_period_start = EXCLUDED.current_period_start, \
               current_period_end = EXCLUDED.current_period_end, \
               cancel_at_period_end = EXCLUDED.cancel_at_period_end, \
               updated_at = now() \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(Uuid::from(input.user_id))
        .bind(input.plan.as_str())
        .bind(input.status.as_str())
        .bind(input.stripe_customer_id)
        .bind(input.stripe_subscription_id)
        .bind(input.current_period_start)
        .bind(input.current_period_end)
        .bind(input.cancel_at_period_end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Subscription::try_from(row)
    }

    async fn set_cancel_at_period_end(
        &self,
        user: UserId,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "UPDATE subscriptions SET cancel_at_period_end = $2, updated_at = now() \
             WHERE user_id = $1 RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(Uuid::from(user))
        .bind(cancel)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Subscription::try_from).transpose()
    }
}
