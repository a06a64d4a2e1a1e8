//! Request extractors for the two kinds of callers: end users with a bearer
//! token and internal services with the shared API key.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::AppError;

/// Header carrying the internal API key.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-api-key";

/// The authenticated end user, from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Token subject.
    pub id: UserId,
    /// E-mail at token issue time.
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;
        let value = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("malformed Authorization header".into()))?;
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("expected a bearer token".into()))?;

        let claims = state.auth.verify(token)?;
        Ok(Self {
            id: UserId::from(claims.sub),
            email: claims.email,
        })
    }
}

/// A trusted backend caller, from the `X-Internal-Api-Key` header.
///
/// Without a configured key, internal endpoints are open outside
/// production and closed in production.
#[derive(Debug, Clone, Copy)]
pub struct InternalCaller;

impl FromRequestParts<AppState> for InternalCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.internal_api_key.as_deref() else {
            if state.config.is_production() {
                return Err(AppError::Unauthorized(
                    "internal endpoints are disabled without INTERNAL_API_KEY".into(),
                ));
            }
            return Ok(Self);
        };
        let provided = parts
            .headers
            .get(INTERNAL_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing internal api key".into()))?;
        if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            return Err(AppError::Unauthorized("invalid internal api key".into()));
        }
        Ok(Self)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_compares_content() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
    }
}
