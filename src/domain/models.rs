//! Persistent entities: users, rooms, members, swipes, matches and
//! subscriptions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::plan::Plan;
use super::{RoomId, UserId};
use crate::error::{AppError, Area};

/// A registered account. Created on first OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Account id.
    pub id: UserId,
    /// Unique, lower-cased e-mail address.
    pub email: String,
    /// Display name from the OAuth provider.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Kind of title a room swipes on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Feature films.
    #[default]
    Movie,
    /// Series.
    Tv,
}

impl MediaType {
    /// Path segment used by the movie catalog.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

/// Optional candidate filters attached to a room.
///
/// Rating, year, runtime and watch-provider bounds are advanced filters and
/// need a plan with `advancedFilters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomFilters {
    /// Movies or series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    /// Catalog genre ids (any of).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<u32>,
    /// Minimum average rating, 0–10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
    /// Maximum average rating, 0–10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<f32>,
    /// Earliest release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    /// Latest release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,
    /// Shortest runtime in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_runtime: Option<u32>,
    /// Longest runtime in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<u32>,
    /// Catalog watch-provider ids (any of).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_providers: Vec<u32>,
    /// ISO 3166-1 region for providers and release dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// ISO 639-1 original language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RoomFilters {
    /// Returns the media type, defaulting to movies.
    #[must_use]
    pub fn media_type(&self) -> MediaType {
        self.media_type.unwrap_or_default()
    }

    /// Returns `true` if any advanced filter is set.
    #[must_use]
    pub fn uses_advanced(&self) -> bool {
        self.min_rating.is_some()
            || self.max_rating.is_some()
            || self.min_year.is_some()
            || self.max_year.is_some()
            || self.min_runtime.is_some()
            || self.max_runtime.is_some()
            || !self.watch_providers.is_empty()
    }

    /// Checks ranges and code formats.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), AppError> {
        for rating in [self.min_rating, self.max_rating].into_iter().flatten() {
            if !(0.0..=10.0).contains(&rating) {
                return Err(AppError::invalid(
                    Area::Rooms,
                    "ratings must be between 0 and 10",
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_rating, self.max_rating)
            && min > max
        {
            return Err(AppError::invalid(
                Area::Rooms,
                "minRating must not exceed maxRating",
            ));
        }
        for year in [self.min_year, self.max_year].into_iter().flatten() {
            if !(1870..=2100).contains(&year) {
                return Err(AppError::invalid(
                    Area::Rooms,
                    "years must be between 1870 and 2100",
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_year, self.max_year)
            && min > max
        {
            return Err(AppError::invalid(Area::Rooms, "minYear must not exceed maxYear"));
        }
        if let (Some(min), Some(max)) = (self.min_runtime, self.max_runtime)
            && min > max
        {
            return Err(AppError::invalid(
                Area::Rooms,
                "minRuntime must not exceed maxRuntime",
            ));
        }
        if let Some(region) = &self.region
            && !is_alpha_code(region, 2)
        {
            return Err(AppError::invalid(
                Area::Rooms,
                "region must be a two-letter country code",
            ));
        }
        if let Some(language) = &self.language
            && !is_alpha_code(language, 2)
        {
            return Err(AppError::invalid(
                Area::Rooms,
                "language must be a two-letter language code",
            ));
        }
        Ok(())
    }
}

fn is_alpha_code(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_alphabetic())
}

/// A shared swiping session.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    /// Room id.
    pub id: RoomId,
    /// Unique join code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Creator; governs the room's plan limits.
    pub created_by: UserId,
    /// Optional lower agreement threshold.
    pub match_threshold: Option<i32>,
    /// Candidate filters.
    pub filters: RoomFilters,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry derived from the creator's plan; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Returns `true` if the room expired at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Fails with [`AppError::Gone`] if the room has expired.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Gone`] in `area` when expired.
    pub fn ensure_active(&self, area: Area) -> Result<(), AppError> {
        if self.is_expired_at(Utc::now()) {
            return Err(AppError::gone(area, format!("room {} expired", self.id)));
        }
        Ok(())
    }
}

/// Input for [`crate::persistence::Store::create_room`].
#[derive(Debug, Clone)]
pub struct NewRoom {
    /// Join code to claim.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Creator.
    pub created_by: UserId,
    /// Optional lower agreement threshold.
    pub match_threshold: Option<i32>,
    /// Candidate filters.
    pub filters: RoomFilters,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Membership of a user in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMember {
    /// Room.
    pub room_id: RoomId,
    /// Member.
    pub user_id: UserId,
    /// Member's display name.
    pub name: Option<String>,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

/// A like/dislike vote. One per (room, user, movie).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swipe {
    /// Swipe id, stable across overwrites.
    pub id: Uuid,
    /// Room.
    pub room_id: RoomId,
    /// Voter.
    pub user_id: UserId,
    /// External title id.
    pub movie_id: String,
    /// `true` = like.
    pub value: bool,
    /// First vote.
    pub created_at: DateTime<Utc>,
    /// Last overwrite.
    pub updated_at: DateTime<Utc>,
}

/// A title that reached the room's agreement threshold. One per
/// (room, movie).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Match id.
    pub id: Uuid,
    /// Room.
    pub room_id: RoomId,
    /// External title id.
    pub movie_id: String,
    /// Positive votes when the match was recorded.
    pub vote_count: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Billing state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Paid and current.
    Active,
    /// In a trial period.
    Trialing,
    /// Payment failed; plan not granted.
    PastDue,
    /// Ended.
    #[serde(alias = "CANCELLED")]
    Canceled,
    /// Checkout not completed.
    Incomplete,
}

impl SubscriptionStatus {
    /// Returns the stored / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Trialing => "TRIALING",
            Self::PastDue => "PAST_DUE",
            Self::Canceled => "CANCELED",
            Self::Incomplete => "INCOMPLETE",
        }
    }

    /// Returns `true` if the subscription's plan applies.
    #[must_use]
    pub const fn grants_plan(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "TRIALING" => Ok(Self::Trialing),
            "PAST_DUE" => Ok(Self::PastDue),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            "INCOMPLETE" => Ok(Self::Incomplete),
            other => Err(AppError::invalid(
                Area::Subscriptions,
                format!("unknown subscription status: {other}"),
            )),
        }
    }
}

/// A user's subscription. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Subscription id.
    pub id: Uuid,
    /// Owner.
    pub user_id: UserId,
    /// Tier.
    pub plan: Plan,
    /// Billing state.
    pub status: SubscriptionStatus,
    /// Stripe customer, needed for the billing portal.
    pub stripe_customer_id: Option<String>,
    /// Stripe subscription.
    pub stripe_subscription_id: Option<String>,
    /// Current billing period start.
    pub current_period_start: Option<DateTime<Utc>>,
    /// Current billing period end.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Ends at period end instead of renewing.
    pub cancel_at_period_end: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Returns the plan that currently applies: the subscribed plan while
    /// active or trialing, otherwise [`Plan::Free`].
    #[must_use]
    pub const fn effective_plan(&self) -> Plan {
        if self.status.grants_plan() {
            self.plan
        } else {
            Plan::Free
        }
    }
}

/// Input for [`crate::persistence::Store::upsert_subscription`].
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    /// Owner.
    pub user_id: UserId,
    /// Tier.
    pub plan: Plan,
    /// Billing state.
    pub status: SubscriptionStatus,
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
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn room(expires_at: Option<DateTime<Utc>>) -> Room {
        Room {
            id: RoomId::new(),
            code: "ABC234".to_string(),
            name: "Friday night".to_string(),
            created_by: UserId::new(),
            match_threshold: None,
            filters: RoomFilters::default(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn basic_filters_are_not_advanced() {
        let filters = RoomFilters {
            media_type: Some(MediaType::Tv),
            genres: vec![18, 35],
            region: Some("US".to_string()),
            language: Some("en".to_string()),
            ..RoomFilters::default()
        };
        assert!(!filters.uses_advanced());
        assert!(filters.validate().is_ok());
    }

    #[test]
    fn bounds_are_advanced() {
        let filters = RoomFilters {
            min_rating: Some(7.0),
            ..RoomFilters::default()
        };
        assert!(filters.uses_advanced());
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let filters = RoomFilters {
            min_year: Some(2020),
            max_year: Some(2000),
            ..RoomFilters::default()
        };
        assert!(filters.validate().is_err());

        let filters = RoomFilters {
            max_rating: Some(11.0),
            ..RoomFilters::default()
        };
        assert!(filters.validate().is_err());
    }

    #[test]
    fn region_must_be_two_letters() {
        let filters = RoomFilters {
            region: Some("USA".to_string()),
            ..RoomFilters::default()
        };
        assert!(filters.validate().is_err());
    }

    #[test]
    fn filters_deserialize_from_camel_case() {
        let json = r#"{"mediaType":"tv","minRating":6.5,"watchProviders":[8]}"#;
        let Ok(filters) = serde_json::from_str::<RoomFilters>(json) else {
            panic!("filters should parse");
        };
        assert_eq!(filters.media_type(), MediaType::Tv);
        assert_eq!(filters.min_rating, Some(6.5));
        assert_eq!(filters.watch_providers, vec![8]);
    }

    #[test]
    fn room_expiry() {
        let now = Utc::now();
        assert!(!room(None).is_expired_at(now));
        assert!(room(Some(now - Duration::minutes(1))).is_expired_at(now));
        assert!(!room(Some(now + Duration::minutes(1))).is_expired_at(now));
        assert!(room(Some(now - Duration::minutes(1))).ensure_active(Area::Rooms).is_err());
    }

    #[test]
    fn lapsed_subscription_falls_back_to_free() {
        let now = Utc::now();
        let mut sub = Subscription {
            id: Uuid::new_v4(),
            user_id: UserId::new(),
            plan: Plan::Pro,
            status: SubscriptionStatus::Active,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(sub.effective_plan(), Plan::Pro);
        sub.status = SubscriptionStatus::PastDue;
        assert_eq!(sub.effective_plan(), Plan::Free);
    }

    #[test]
    fn status_parses_both_spellings() {
        assert_eq!(
            "cancelled".parse::<SubscriptionStatus>().ok(),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(
            "past_due".parse::<SubscriptionStatus>().ok(),
            Some(SubscriptionStatus::PastDue)
        );
    }
}
