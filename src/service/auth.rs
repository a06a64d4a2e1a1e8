//! Sign-in and access tokens.
//!
//! The frontend performs the OAuth dance and then calls the internal
//! upsert/login endpoints with the provider's verified e-mail. This service
//! upserts the user and issues an HS256 JWT that the bearer extractor
//! verifies on every other request.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MAX_JWT_TTL_HOURS;
use crate::domain::{User, UserId};
use crate::error::{AppError, Area};
use crate::persistence::Store;

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 100;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// User e-mail at issue time.
    pub email: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// The signed-in user.
    pub user: User,
}

/// User upsert, token issuing and verification.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Creates a service signing with `secret`; tokens live `ttl_hours`,
    /// clamped to `1..=MAX_JWT_TTL_HOURS`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, secret: &str, ttl_hours: i64) -> Self {
        Self {
            store,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.clamp(1, MAX_JWT_TTL_HOURS)),
        }
    }

    /// Creates the user for `email` or updates its name.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a malformed e-mail or name.
    pub async fn oauth_upsert(&self, email: &str, name: Option<&str>) -> Result<User, AppError> {
        let email = normalize_email(email)?;
        let name = normalize_name(name)?;
        let user = self.store.upsert_user(&email, name.as_deref()).await?;
        tracing::info!(user_id = %user.id, "user upserted");
        Ok(user)
    }

    /// Upserts the user and issues an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for malformed input or
    /// [`AppError::Internal`] if signing fails.
    pub async fn login_oauth(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<IssuedToken, AppError> {
        let user = self.oauth_upsert(email, name).await?;
        let access_token = self.issue_token(&user)?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.ttl.num_seconds(),
            user,
        })
    }

    /// Signs a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the expiry is out of range or
    /// signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: user.id.into(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies signature and expiry of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] for any invalid token.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))
    }

    /// Loads the user a verified token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the user no longer exists.
    pub async fn current_user(&self, id: UserId) -> Result<User, AppError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("user {id} no longer exists")))
    }
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            })
        && !email.contains(char::is_whitespace);
    if !valid {
        return Err(AppError::invalid(Area::Auth, "email must be a valid address"));
    }
    Ok(email)
}

fn normalize_name(name: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::invalid(
            Area::Auth,
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(Some(name.to_string()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), "test-secret", 1)
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let auth = service();
        let Ok(issued) = auth.login_oauth(" Ana@Example.com ", Some("Ana")).await else {
            panic!("login should succeed");
        };
        assert_eq!(issued.expires_in, 3600);
        let Ok(claims) = auth.verify(&issued.access_token) else {
            panic!("token should verify");
        };
        assert_eq!(UserId::from(claims.sub), issued.user.id);
        assert_eq!(claims.email, "ana@example.com");
        assert!(auth.current_user(issued.user.id).await.is_ok());
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let issuer = AuthService::new(Arc::clone(&store), "one", 1);
        let verifier = AuthService::new(store, "two", 1);
        let Ok(issued) = issuer.login_oauth("ana@example.com", None).await else {
            panic!("login should succeed");
        };
        assert!(matches!(
            verifier.verify(&issued.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn oversized_ttl_is_clamped() {
        let auth = AuthService::new(Arc::new(MemoryStore::new()), "test-secret", i64::MAX);
        let Ok(issued) = auth.login_oauth("ana@example.com", None).await else {
            panic!("login should succeed");
        };
        assert_eq!(issued.expires_in, MAX_JWT_TTL_HOURS * 3600);
        assert!(auth.verify(&issued.access_token).is_ok());

        let floor = AuthService::new(Arc::new(MemoryStore::new()), "test-secret", -5);
        assert_eq!(floor.ttl, Duration::hours(1));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(
            service().verify("not.a.jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let auth = service();
        for email in ["", "no-at-sign", "@example.com", "ana@localhost", "a b@example.com"] {
            assert!(
                matches!(
                    auth.oauth_upsert(email, None).await,
                    Err(AppError::Validation { .. })
                ),
                "{email}"
            );
        }
    }

    #[tokio::test]
    async fn blank_name_keeps_existing() {
        let auth = service();
        let _ = auth.oauth_upsert("ana@example.com", Some("Ana")).await;
        let Ok(user) = auth.oauth_upsert("ana@example.com", Some("   ")).await else {
            panic!("upsert should succeed");
        };
        assert_eq!(user.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        assert!(matches!(
            service().current_user(UserId::new()).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
