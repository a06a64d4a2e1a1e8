//! Subscriptions, effective plans and usage reporting.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::clients::StripeClient;
use crate::domain::plan::{self, Limit, LimitCheck};
use crate::domain::{
    FeatureLimits, Plan, Subscription, SubscriptionStatus, SubscriptionUpsert, UserId,
};
use crate::error::{AppError, Area};
use crate::persistence::Store;

/// A plan together with the limits it grants and the caller's usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageReport {
    /// Effective plan.
    pub plan: Plan,
    /// Limits of that plan.
    pub limits: FeatureLimits,
    /// Active rooms the user created, checked against `max_rooms`.
    pub rooms: LimitCheck,
}

/// Reads and writes subscriptions and resolves effective plans.
#[derive(Debug, Clone)]
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    billing: Option<StripeClient>,
}

impl SubscriptionService {
    /// Creates a new `SubscriptionService`. `billing` is `None` when the
    /// billing portal is not configured.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, billing: Option<StripeClient>) -> Self {
        Self { store, billing }
    }

    /// Returns the plan that applies to `user` right now.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] on store failure.
    pub async fn effective_plan(&self, user: UserId) -> Result<Plan, AppError> {
        Ok(self
            .store
            .get_subscription(user)
            .await?
            .map_or(Plan::Free, |s| s.effective_plan()))
    }

    /// Returns the subscription of `user`, or an unsaved FREE/ACTIVE
    /// placeholder when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] on store failure.
    pub async fn get_for_user(&self, user: UserId) -> Result<Subscription, AppError> {
        if let Some(subscription) = self.store.get_subscription(user).await? {
            return Ok(subscription);
        }
        let now = Utc::now();
        Ok(Subscription {
            id: Uuid::nil(),
            user_id: user,
            plan: Plan::Free,
            status: SubscriptionStatus::Active,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reports the effective plan, its limits and current usage.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] on store failure.
    pub async fn usage(&self, user: UserId) -> Result<UsageReport, AppError> {
        let plan = self.effective_plan(user).await?;
        let active_rooms = self
            .store
            .count_active_rooms_created_by(user, Utc::now())
            .await?;
        Ok(UsageReport {
            plan,
            limits: plan.limits(),
            rooms: plan::check_limit(plan, Limit::Rooms, active_rooms),
        })
    }

    /// Creates or replaces the subscription of `input.user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the user does not exist, or
    /// [`AppError::Validation`] if the billing period is inverted.
    pub async fn upsert(&self, input: SubscriptionUpsert) -> Result<Subscription, AppError> {
        if let (Some(start), Some(end)) = (input.current_period_start, input.current_period_end)
            && end < start
        {
            return Err(AppError::invalid(
                Area::Subscriptions,
                "currentPeriodEnd must not be before currentPeriodStart",
            ));
        }
        if self.store.get_user(input.user_id).await?.is_none() {
            return Err(AppError::not_found(
                Area::Subscriptions,
                format!("user {} does not exist", input.user_id),
            ));
        }
        let subscription = self.store.upsert_subscription(input).await?;
        tracing::info!(
            user_id = %subscription.user_id,
            plan = %subscription.plan,
            status = %subscription.status,
            "subscription upserted"
        );
        Ok(subscription)
    }

    /// Marks the subscription of `user` to end at the period end.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when the user has no subscription.
    pub async fn cancel(&self, user: UserId) -> Result<Subscription, AppError> {
        let subscription = self
            .store
            .set_cancel_at_period_end(user, true)
            .await?
            .ok_or_else(|| {
                AppError::not_found(Area::Subscriptions, format!("user {user} has no subscription"))
            })?;
        tracing::info!(user_id = %user, "subscription set to cancel at period end");
        Ok(subscription)
    }

    /// Opens a billing-portal session and returns its URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] without billing configuration,
    /// [`AppError::Validation`] for a non-HTTP return URL,
    /// [`AppError::NotFound`] without a billing customer, or
    /// [`AppError::Upstream`] if the billing API fails.
    pub async fn portal_session(&self, user: UserId, return_url: &str) -> Result<String, AppError> {
        let Some(billing) = &self.billing else {
            return Err(AppError::Unavailable {
                area: Area::Subscriptions,
                service: "stripe",
            });
        };
        let return_url = return_url.trim();
        if !(return_url.starts_with("https://") || return_url.starts_with("http://")) {
            return Err(AppError::invalid(
                Area::Subscriptions,
                "returnUrl must be an http(s) URL",
            ));
        }
        let customer = self
            .store
            .get_subscription(user)
            .await?
            .and_then(|s| s.stripe_customer_id)
            .ok_or_else(|| {
                AppError::not_found(
                    Area::Subscriptions,
                    format!("user {user} has no billing customer"),
                )
            })?;
        billing.create_portal_session(&customer, return_url).await
    }
}
