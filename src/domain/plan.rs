//! Subscription plans and the feature limits they grant.
//!
//! Everything here is a pure table lookup: the same [`Plan`] always yields
//! the same [`FeatureLimits`]. A numeric limit of [`UNLIMITED`] (`-1`)
//! always allows the action.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, Area};

/// Sentinel for "no limit".
pub const UNLIMITED: i64 = -1;

/// Subscription tier. Ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    /// Default tier for every account.
    Free,
    /// Small groups.
    Starter,
    /// Power users.
    Pro,
    /// Organisations.
    Team,
}

impl Plan {
    /// Every plan, lowest first.
    pub const ALL: [Self; 4] = [Self::Free, Self::Starter, Self::Pro, Self::Team];

    /// Returns the stored / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Starter => "STARTER",
            Self::Pro => "PRO",
            Self::Team => "TEAM",
        }
    }

    /// Returns the limits granted by this plan.
    #[must_use]
    pub const fn limits(self) -> FeatureLimits {
        limits_for(self)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(Self::Free),
            "STARTER" => Ok(Self::Starter),
            "PRO" => Ok(Self::Pro),
            "TEAM" => Ok(Self::Team),
            other => Err(AppError::invalid(
                Area::Subscriptions,
                format!("unknown plan: {other}"),
            )),
        }
    }
}

/// Numeric limits, each either a count or [`UNLIMITED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// Active rooms a user may have created.
    Rooms,
    /// Members in a room.
    Participants,
    /// Swipes per member per room.
    SwipesPerRoom,
}

impl Limit {
    const fn label(self) -> &'static str {
        match self {
            Self::Rooms => "active rooms",
            Self::Participants => "participants per room",
            Self::SwipesPerRoom => "swipes per room",
        }
    }
}

/// Boolean capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Rating, year, runtime and watch-provider room filters.
    AdvancedFilters,
    /// Match notification e-mails.
    EmailNotifications,
    /// Programmatic API access.
    ApiAccess,
}

/// Limits granted by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureLimits {
    /// Active rooms a user may have created (`-1` = unlimited).
    pub max_rooms: i64,
    /// Members per room (`-1` = unlimited).
    pub max_participants: i64,
    /// Swipes per member per room (`-1` = unlimited).
    pub max_swipes_per_room: i64,
    /// Advanced room filters allowed.
    pub advanced_filters: bool,
    /// Match notification e-mails.
    pub email_notifications: bool,
    /// Programmatic API access.
    pub api_access: bool,
    /// Days until a room expires (`-1` = never).
    pub room_expiration_days: i64,
}

impl FeatureLimits {
    /// Returns the numeric value for `limit`.
    #[must_use]
    pub const fn get(&self, limit: Limit) -> i64 {
        match limit {
            Limit::Rooms => self.max_rooms,
            Limit::Participants => self.max_participants,
            Limit::SwipesPerRoom => self.max_swipes_per_room,
        }
    }

    /// Returns whether `feature` is enabled.
    #[must_use]
    pub const fn has(&self, feature: Feature) -> bool {
        match feature {
            Feature::AdvancedFilters => self.advanced_filters,
            Feature::EmailNotifications => self.email_notifications,
            Feature::ApiAccess => self.api_access,
        }
    }
}

const FREE: FeatureLimits = FeatureLimits {
    max_rooms: 3,
    max_participants: 4,
    max_swipes_per_room: 50,
    advanced_filters: false,
    email_notifications: false,
    api_access: false,
    room_expiration_days: 1,
};

const STARTER: FeatureLimits = FeatureLimits {
    max_rooms: 10,
    max_participants: 8,
    max_swipes_per_room: 200,
    advanced_filters: true,
    email_notifications: true,
    api_access: false,
    room_expiration_days: 7,
};

const PRO: FeatureLimits = FeatureLimits {
    max_rooms: UNLIMITED,
    max_participants: 20,
    max_swipes_per_room: UNLIMITED,
    advanced_filters: true,
    email_notifications: true,
    api_access: true,
    room_expiration_days: 30,
};

const TEAM: FeatureLimits = FeatureLimits {
    max_rooms: UNLIMITED,
    max_participants: UNLIMITED,
    max_swipes_per_room: UNLIMITED,
    advanced_filters: true,
    email_notifications: true,
    api_access: true,
    room_expiration_days: UNLIMITED,
};

/// Returns the static limits for `plan`.
#[must_use]
pub const fn limits_for(plan: Plan) -> FeatureLimits {
    match plan {
        Plan::Free => FREE,
        Plan::Starter => STARTER,
        Plan::Pro => PRO,
        Plan::Team => TEAM,
    }
}

/// Returns `true` when `current_usage` is still below the plan's limit.
#[must_use]
pub const fn can_perform_action(plan: Plan, limit: Limit, current_usage: i64) -> bool {
    let max = limits_for(plan).get(limit);
    max == UNLIMITED || current_usage < max
}

/// Result of [`check_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LimitCheck {
    /// Whether one more action is allowed.
    pub allowed: bool,
    /// Configured limit (`-1` = unlimited).
    pub limit: i64,
    /// Usage the check was made against.
    pub current: i64,
    /// Actions left; `None` when unlimited.
    pub remaining: Option<i64>,
}

/// Compares `current_usage` against the plan's limit.
#[must_use]
pub const fn check_limit(plan: Plan, limit: Limit, current_usage: i64) -> LimitCheck {
    let max = limits_for(plan).get(limit);
    let remaining = if max == UNLIMITED {
        None
    } else if current_usage >= max {
        Some(0)
    } else {
        Some(max - current_usage)
    };
    LimitCheck {
        allowed: can_perform_action(plan, limit, current_usage),
        limit: max,
        current: current_usage,
        remaining,
    }
}

/// Returns whether `plan` enables `feature`.
#[must_use]
pub const fn has_feature(plan: Plan, feature: Feature) -> bool {
    limits_for(plan).has(feature)
}

/// Returns `true` when `plan` is at least `required`.
#[must_use]
pub fn is_plan_higher_or_equal(plan: Plan, required: Plan) -> bool {
    plan >= required
}

/// Fails with [`AppError::LimitExceeded`] when the plan's limit is reached.
///
/// # Errors
///
/// Returns [`AppError::LimitExceeded`] naming the limit and the plan.
pub fn ensure_within(
    plan: Plan,
    limit: Limit,
    current_usage: i64,
    area: Area,
) -> Result<(), AppError> {
    let check = check_limit(plan, limit, current_usage);
    if check.allowed {
        return Ok(());
    }
    Err(AppError::LimitExceeded {
        area,
        message: format!(
            "The {plan} plan allows {} {}. Upgrade your plan to continue.",
            check.limit,
            limit.label()
        ),
    })
}

/// Returns when a room created at `created_at` under `plan` expires, or
/// `None` when it never does.
#[must_use]
pub fn room_expiry(plan: Plan, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let days = limits_for(plan).room_expiration_days;
    if days == UNLIMITED {
        None
    } else {
        Some(created_at + Duration::days(days))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_pure() {
        for plan in Plan::ALL {
            assert_eq!(limits_for(plan), limits_for(plan));
            assert_eq!(plan.limits(), limits_for(plan));
        }
    }

    #[test]
    fn unlimited_always_allows() {
        assert!(can_perform_action(Plan::Team, Limit::Participants, 0));
        assert!(can_perform_action(Plan::Team, Limit::Participants, i64::MAX));
        assert!(can_perform_action(Plan::Pro, Limit::Rooms, 1_000_000));
    }

    #[test]
    fn numeric_limit_is_exclusive() {
        assert!(can_perform_action(Plan::Free, Limit::Rooms, 2));
        assert!(!can_perform_action(Plan::Free, Limit::Rooms, 3));
        assert!(!can_perform_action(Plan::Free, Limit::Participants, 4));
    }

    #[test]
    fn check_limit_reports_remaining() {
        let check = check_limit(Plan::Starter, Limit::Rooms, 4);
        assert!(check.allowed);
        assert_eq!(check.limit, 10);
        assert_eq!(check.remaining, Some(6));

        let over = check_limit(Plan::Free, Limit::SwipesPerRoom, 60);
        assert!(!over.allowed);
        assert_eq!(over.remaining, Some(0));

        let unlimited = check_limit(Plan::Team, Limit::SwipesPerRoom, 60);
        assert!(unlimited.allowed);
        assert_eq!(unlimited.remaining, None);
    }

    #[test]
    fn features_follow_table() {
        assert!(!has_feature(Plan::Free, Feature::AdvancedFilters));
        assert!(has_feature(Plan::Starter, Feature::EmailNotifications));
        assert!(!has_feature(Plan::Starter, Feature::ApiAccess));
        assert!(has_feature(Plan::Pro, Feature::ApiAccess));
    }

    #[test]
    fn plan_ordering() {
        assert!(is_plan_higher_or_equal(Plan::Pro, Plan::Starter));
        assert!(is_plan_higher_or_equal(Plan::Team, Plan::Team));
        assert!(!is_plan_higher_or_equal(Plan::Free, Plan::Starter));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("pro".parse::<Plan>().ok(), Some(Plan::Pro));
        assert_eq!(" Team ".parse::<Plan>().ok(), Some(Plan::Team));
        assert!("GOLD".parse::<Plan>().is_err());
    }

    #[test]
    fn ensure_within_names_plan() {
        let Err(err) = ensure_within(Plan::Free, Limit::Rooms, 3, Area::Rooms) else {
            panic!("expected limit error");
        };
        assert!(err.client_message().contains("FREE"));
        assert!(ensure_within(Plan::Pro, Limit::Rooms, 3, Area::Rooms).is_ok());
    }

    #[test]
    fn room_expiry_per_plan() {
        let now = Utc::now();
        assert_eq!(room_expiry(Plan::Free, now), Some(now + Duration::days(1)));
        assert_eq!(room_expiry(Plan::Team, now), None);
    }
}
