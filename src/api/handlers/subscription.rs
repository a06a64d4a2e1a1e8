//! Subscription handlers: current plan, limits, sync, cancel, billing portal.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    LimitsResponse, PlanDto, PortalRequest, PortalResponse, SubscriptionDto,
    UpsertSubscriptionRequest,
};
use crate::api::extract::{AuthUser, InternalCaller};
use crate::app_state::AppState;
use crate::domain::{Plan, UserId};
use crate::error::{AppError, ErrorResponse};

/// `GET /subscriptions/me`: The caller's subscription.
///
/// # Errors
///
/// Returns [`AppError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/me",
    tag = "Subscriptions",
    summary = "My subscription",
    description = "Users without a stored subscription get an implicit active FREE one with a nil id.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionDto),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn my_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let sub = state.subscriptions.get_for_user(user.id).await?;
    Ok(Json(SubscriptionDto::from(sub)))
}

/// `GET /subscriptions/me/limits`: Effective plan, limits and usage.
///
/// # Errors
///
/// Returns [`AppError::Persistence`] on store failure.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/me/limits",
    tag = "Subscriptions",
    summary = "My limits and usage",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Limits and usage", body = LimitsResponse),
    )
)]
pub async fn my_limits(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let report = state.subscriptions.usage(user.id).await?;
    Ok(Json(LimitsResponse::from(report)))
}

/// `PUT /subscriptions/users/{userId}`: Sync a subscription from billing.
///
/// # Errors
///
/// Returns [`AppError`] for a bad internal key, an inverted period or an
/// unknown user.
#[utoipa::path(
    put,
    path = "/api/v1/subscriptions/users/{userId}",
    tag = "Subscriptions",
    summary = "Upsert a user's subscription",
    description = "Called by the billing webhook relay. Requires the internal API key. Omitted billing ids keep their stored values.",
    request_body = UpsertSubscriptionRequest,
    params(
        ("userId" = Uuid, Path, description = "User UUID"),
        ("x-internal-api-key" = String, Header, description = "Internal API key"),
    ),
    responses(
        (status = 200, description = "Stored subscription", body = SubscriptionDto),
        (status = 400, description = "Invalid period", body = ErrorResponse),
        (status = 401, description = "Missing or invalid internal key", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn upsert_subscription(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpsertSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let sub = state
        .subscriptions
        .upsert(req.into_upsert(UserId::from(user_id)))
        .await?;
    Ok(Json(SubscriptionDto::from(sub)))
}

/// `DELETE /subscriptions/me`: Cancel at the end of the period.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] when the caller has no subscription.
#[utoipa::path(
    delete,
    path = "/api/v1/subscriptions/me",
    tag = "Subscriptions",
    summary = "Cancel my subscription",
    description = "Marks the subscription to end with the current period. The plan applies until then.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated subscription", body = SubscriptionDto),
        (status = 404, description = "No subscription", body = ErrorResponse),
    )
)]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let sub = state.subscriptions.cancel(user.id).await?;
    Ok(Json(SubscriptionDto::from(sub)))
}

/// `POST /subscriptions/me/portal`: Open a billing portal session.
///
/// # Errors
///
/// Returns [`AppError`] for a bad return URL, a caller without a billing
/// customer, or billing failures.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/me/portal",
    tag = "Subscriptions",
    summary = "Billing portal session",
    security(("bearer" = [])),
    request_body = PortalRequest,
    responses(
        (status = 200, description = "Portal URL", body = PortalResponse),
        (status = 400, description = "Invalid return URL", body = ErrorResponse),
        (status = 404, description = "No billing customer", body = ErrorResponse),
        (status = 502, description = "Billing failed", body = ErrorResponse),
        (status = 503, description = "Billing not configured", body = ErrorResponse),
    )
)]
pub async fn portal_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PortalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let url = state
        .subscriptions
        .portal_session(user.id, &req.return_url)
        .await?;
    Ok(Json(PortalResponse { url }))
}

/// `GET /subscriptions/plans`: Every plan and its limits.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/plans",
    tag = "Subscriptions",
    summary = "List plans",
    responses(
        (status = 200, description = "Plans, lowest first", body = Vec<PlanDto>),
    )
)]
pub async fn list_plans() -> impl IntoResponse {
    let plans: Vec<PlanDto> = Plan::ALL
        .into_iter()
        .map(|plan| PlanDto {
            plan,
            limits: plan.limits(),
        })
        .collect();
    Json(plans)
}

/// Subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions/me",
            get(my_subscription).delete(cancel_subscription),
        )
        .route("/subscriptions/me/limits", get(my_limits))
        .route("/subscriptions/me/portal", post(portal_session))
        .route("/subscriptions/users/{user_id}", put(upsert_subscription))
        .route("/subscriptions/plans", get(list_plans))
}
