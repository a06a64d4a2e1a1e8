//! Database row types and their conversion into domain entities.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Match, Room, RoomFilters, RoomMember, Subscription, Swipe, User,
};
use crate::error::AppError;

/// A row from `users`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique e-mail.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.into(),
            email: row.email,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// A row from `rooms`.
#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique join code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Creator.
    pub created_by: Uuid,
    /// Optional agreement threshold.
    pub match_threshold: Option<i32>,
    /// JSONB filters.
    pub filters: Json<RoomFilters>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id.into(),
            code: row.code,
            name: row.name,
            created_by: row.created_by.into(),
            match_threshold: row.match_threshold,
            filters: row.filters.0,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// A `room_members` row joined with the member's name.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    /// Room.
    pub room_id: Uuid,
    /// Member.
    pub user_id: Uuid,
    /// Member's display name.
    pub name: Option<String>,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<MemberRow> for RoomMember {
    fn from(row: MemberRow) -> Self {
        Self {
            room_id: row.room_id.into(),
            user_id: row.user_id.into(),
            name: row.name,
            joined_at: row.joined_at,
        }
    }
}

/// A row from `swipes`.
#[derive(Debug, Clone, FromRow)]
pub struct SwipeRow {
    /// Primary key.
    pub id: Uuid,
    /// Room.
    pub room_id: Uuid,
    /// Voter.
    pub user_id: Uuid,
    /// External title id.
    pub movie_id: String,
    /// Like / dislike.
    pub value: bool,
    /// First vote.
    pub created_at: DateTime<Utc>,
    /// Last overwrite.
    pub updated_at: DateTime<Utc>,
}

impl From<SwipeRow> for Swipe {
    fn from(row: SwipeRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id.into(),
            user_id: row.user_id.into(),
            movie_id: row.movie_id,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row from `matches`.
#[derive(Debug, Clone, FromRow)]
pub struct MatchRow {
    /// Primary key.
    pub id: Uuid,
    /// Room.
    pub room_id: Uuid,
    /// External title id.
    pub movie_id: String,
    /// Votes at match time.
    pub vote_count: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id.into(),
            movie_id: row.movie_id,
            vote_count: row.vote_count,
            created_at: row.created_at,
        }
    }
}

/// A row from `subscriptions`. Plan and status are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    /// Primary key.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Plan name, e.g. `"PRO"`.
    pub plan: String,
    /// Status name, e.g. `"ACTIVE"`.
    pub status: String,
    /// Stripe customer.
    pub stripe_customer_id: Option<String>,
    /// Stripe subscription.
    pub stripe_subscription_id: Option<String>,
    /// Period start.
    pub current_period_start: Option<DateTime<Utc>>,
    /// Period end.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Ends at period end.
    pub cancel_at_period_end: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = AppError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let plan = row
            .plan
            .parse()
            .map_err(|_| AppError::Persistence(format!("corrupt plan value: {}", row.plan)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| AppError::Persistence(format!("corrupt status value: {}", row.status)))?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id.into(),
            plan,
            status,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Plan, SubscriptionStatus};

    fn subscription_row(plan: &str, status: &str) -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan: plan.to_string(),
            status: status.to_string(),
            stripe_customer_id: Some("cus_123".to_string()),
            stripe_subscription_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn subscription_row_parses_enums() {
        let Ok(sub) = Subscription::try_from(subscription_row("STARTER", "TRIALING")) else {
            panic!("row should convert");
        };
        assert_eq!(sub.plan, Plan::Starter);
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
    }

    #[test]
    fn corrupt_plan_is_a_persistence_error() {
        let result = Subscription::try_from(subscription_row("GOLD", "ACTIVE"));
        assert!(matches!(result, Err(AppError::Persistence(_))));
    }

    #[test]
    fn room_row_unwraps_filters() {
        let filters = RoomFilters {
            genres: vec![28],
            ..RoomFilters::default()
        };
        let row = RoomRow {
            id: Uuid::new_v4(),
            code: "ABC234".to_string(),
            name: "Movie night".to_string(),
            created_by: Uuid::new_v4(),
            match_threshold: Some(2),
            filters: Json(filters.clone()),
            created_at: Utc::now(),
            expires_at: None,
        };
        let room = Room::from(row);
        assert_eq!(room.filters, filters);
        assert_eq!(room.match_threshold, Some(2));
    }
}
