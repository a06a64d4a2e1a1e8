//! Subscription, limits and billing DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::plan::LimitCheck;
use crate::domain::{
    FeatureLimits, Plan, Subscription, SubscriptionStatus, SubscriptionUpsert, UserId,
};
use crate::service::UsageReport;

/// A subscription.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    /// Subscription id; nil for the implicit FREE subscription.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Subscribed tier.
    pub plan: Plan,
    /// Billing state.
    pub status: SubscriptionStatus,
    /// Tier that currently applies.
    pub effective_plan: Plan,
    /// Billing customer.
    pub stripe_customer_id: Option<String>,
    /// Billing subscription.
    pub stripe_subscription_id: Option<String>,
    /// Current period start.
    pub current_period_start: Option<DateTime<Utc>>,
    /// Current period end.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Ends at the period end.
    pub cancel_at_period_end: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionDto {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            user_id: sub.user_id.into(),
            plan: sub.plan,
            status: sub.status,
            effective_plan: sub.effective_plan(),
            stripe_customer_id: sub.stripe_customer_id,
            stripe_subscription_id: sub.stripe_subscription_id,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            created_at: sub.created_at,
            updated_at: sub.updated_at,
        }
    }
}

/// Request body for `PUT /subscriptions/users/{userId}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSubscriptionRequest {
    /// Tier.
    pub plan: Plan,
    /// Billing state.
    pub status: SubscriptionStatus,
    /// Billing customer; omitted keeps the stored one.
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// Billing subscription; omitted keeps the stored one.
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,
    /// Period start.
    #[serde(default)]
    pub current_period_start: Option<DateTime<Utc>>,
    /// Period end.
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    /// Ends at the period end. Defaults to `false`.
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl UpsertSubscriptionRequest {
    /// Converts into the store input for `user_id`.
    #[must_use]
    pub fn into_upsert(self, user_id: UserId) -> SubscriptionUpsert {
        SubscriptionUpsert {
            user_id,
            plan: self.plan,
            status: self.status,
            stripe_customer_id: self.stripe_customer_id,
            stripe_subscription_id: self.stripe_subscription_id,
            current_period_start: self.current_period_start,
            current_period_end: self.current_period_end,
            cancel_at_period_end: self.cancel_at_period_end,
        }
    }
}

/// Usage counters.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageDto {
    /// Active rooms the caller created.
    pub active_rooms: i64,
    /// Active rooms checked against `maxRooms`.
    pub rooms: LimitCheck,
}

/// Response body for `GET /subscriptions/me/limits`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LimitsResponse {
    /// Effective plan.
    pub plan: Plan,
    /// Limits of that plan.
    pub limits: FeatureLimits,
    /// Current usage.
    pub usage: UsageDto,
}

impl From<UsageReport> for LimitsResponse {
    fn from(report: UsageReport) -> Self {
        Self {
            plan: report.plan,
            limits: report.limits,
            usage: UsageDto {
                active_rooms: report.rooms.current,
                rooms: report.rooms,
            },
        }
    }
}

/// A plan and its limits, for `GET /subscriptions/plans`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlanDto {
    /// Tier.
    pub plan: Plan,
    /// Limits it grants.
    pub limits: FeatureLimits,
}

/// Request body for `POST /subscriptions/me/portal`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    /// Where the billing portal sends the user back to.
    pub return_url: String,
}

/// Response body for `POST /subscriptions/me/portal`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PortalResponse {
    /// Billing portal URL.
    pub url: String,
}
