//! Sign-in DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::User;
use crate::service::IssuedToken;

/// Request body for `POST /auth/oauth-upsert` and `POST /auth/login-oauth`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuthUserRequest {
    /// Verified e-mail from the OAuth provider.
    pub email: String,
    /// Display name from the provider.
    #[serde(default)]
    pub name: Option<String>,
}

/// A user account.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// User id.
    pub id: Uuid,
    /// E-mail address.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

/// Response body for `POST /auth/login-oauth`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer JWT.
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    /// Signed-in user.
    pub user: UserDto,
}

impl From<IssuedToken> for LoginResponse {
    fn from(token: IssuedToken) -> Self {
        Self {
            access_token: token.access_token,
            token_type: "Bearer".to_string(),
            expires_in: token.expires_in,
            user: token.user.into(),
        }
    }
}
