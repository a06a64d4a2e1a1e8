//! Sign-in handlers: OAuth upsert and login (internal), current user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{LoginResponse, OAuthUserRequest, UserDto};
use crate::api::extract::{AuthUser, InternalCaller};
use crate::app_state::AppState;
use crate::error::{AppError, ErrorResponse};

/// `POST /auth/oauth-upsert`: Create or update a user from an OAuth profile.
///
/// # Errors
///
/// Returns [`AppError`] for a bad internal key or malformed profile.
#[utoipa::path(
    post,
    path = "/api/v1/auth/oauth-upsert",
    tag = "Auth",
    summary = "Upsert an OAuth user",
    description = "Called by the web frontend after the OAuth provider verified the e-mail. Requires the internal API key.",
    request_body = OAuthUserRequest,
    params(
        ("x-internal-api-key" = String, Header, description = "Internal API key"),
    ),
    responses(
        (status = 201, description = "User created or updated", body = UserDto),
        (status = 400, description = "Malformed e-mail or name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid internal key", body = ErrorResponse),
    )
)]
pub async fn oauth_upsert(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Json(req): Json<OAuthUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .oauth_upsert(&req.email, req.name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

/// `POST /auth/login-oauth`: Upsert the user and issue a bearer token.
///
/// # Errors
///
/// Returns [`AppError`] for a bad internal key, malformed profile or
/// signing failure.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login-oauth",
    tag = "Auth",
    summary = "Sign in with an OAuth profile",
    description = "Upserts the user like `oauth-upsert` and returns a signed JWT for the API. Requires the internal API key.",
    request_body = OAuthUserRequest,
    params(
        ("x-internal-api-key" = String, Header, description = "Internal API key"),
    ),
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Malformed e-mail or name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid internal key", body = ErrorResponse),
    )
)]
pub async fn login_oauth(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Json(req): Json<OAuthUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = state
        .auth
        .login_oauth(&req.email, req.name.as_deref())
        .await?;
    Ok(Json(LoginResponse::from(token)))
}

/// `GET /auth/me`: The signed-in user.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] for a missing, invalid or stale token.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    summary = "Current user",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The signed-in user", body = UserDto),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.current_user(user.id).await?;
    Ok(Json(UserDto::from(user)))
}

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/oauth-upsert", post(oauth_upsert))
        .route("/auth/login-oauth", post(login_oauth))
        .route("/auth/me", get(me))
}
