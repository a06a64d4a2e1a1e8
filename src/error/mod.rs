//! Application error type with HTTP status code mapping.
//!
//! [`AppError`] is the single error type returned by the store, the
//! services and the outbound clients. Each variant maps to an HTTP status
//! and carries the [`Area`] it came from, which selects the client-facing
//! message from [`messages`].
//!
//! Rendering happens in two steps. [`AppError::into_response`] produces a
//! production-safe body and attaches an [`ErrorReport`] extension; the
//! error envelope middleware (`api::middleware::render_errors`) then
//! re-renders the final body with the request path and the environment's
//! detail policy.

pub mod messages;
pub mod sanitize;

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Feature area an error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    /// Room creation, lookup, membership.
    Rooms,
    /// Sign-in, tokens, internal callers.
    Auth,
    /// Movie catalog.
    Movies,
    /// Swipe recording.
    Swipes,
    /// Match listing.
    Matches,
    /// Plans, billing, limits.
    Subscriptions,
    /// Anything else.
    General,
}

/// JSON error body returned by every failing endpoint.
///
/// ```json
/// {
///   "statusCode": 404,
///   "timestamp": "2024-01-01T00:00:00Z",
///   "path": "/api/v1/rooms/code/ABC123",
///   "error": "Not Found",
///   "message": "Room not found. Check the code and try again."
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Time the error was rendered.
    pub timestamp: DateTime<Utc>,
    /// Request path.
    pub path: String,
    /// Status reason in production, error kind elsewhere.
    pub error: String,
    /// Human-readable message safe to show to end users.
    pub message: String,
    /// Internal detail; omitted in production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything the error envelope needs to render an [`ErrorResponse`].
///
/// Travels from [`AppError::into_response`] to the middleware as a
/// response extension.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// HTTP status.
    pub status: StatusCode,
    /// Variant name, e.g. `"NotFound"`.
    pub kind: &'static str,
    /// Client-facing message.
    pub message: String,
    /// Full internal description (unsanitised).
    pub detail: String,
}

impl ErrorReport {
    /// Builds a report for a response that did not come from an [`AppError`]
    /// (framework rejections, unknown routes, panics).
    #[must_use]
    pub fn from_status(status: StatusCode, detail: String) -> Self {
        Self {
            status,
            kind: "HttpError",
            message: messages::generic(status).to_string(),
            detail,
        }
    }

    /// Renders the body for `path`. `production` suppresses the detail and
    /// replaces the error kind with the canonical status reason.
    #[must_use]
    pub fn render(&self, path: &str, production: bool) -> ErrorResponse {
        let reason = self.status.canonical_reason().unwrap_or("Error");
        let (error, detail) = if production {
            (reason.to_string(), None)
        } else {
            (self.kind.to_string(), Some(sanitize::sanitize(&self.detail)))
        };
        ErrorResponse {
            status_code: self.status.as_u16(),
            timestamp: Utc::now(),
            path: path.to_string(),
            error,
            message: self.message.clone(),
            detail,
        }
    }
}

/// Server-side error enum with HTTP status code mapping.
///
/// | Variant         | HTTP Status |
/// |-----------------|-------------|
/// | `Validation`    | 400 |
/// | `Unauthorized`  | 401 |
/// | `Forbidden`     | 403 |
/// | `LimitExceeded` | 403 |
/// | `NotFound`      | 404 |
/// | `Conflict`      | 409 |
/// | `Gone`          | 410 |
/// | `RateLimited`   | 429 |
/// | `Upstream`      | 502 |
/// | `Unavailable`   | 503 |
/// | `Persistence`   | 500 |
/// | `Internal`      | 500 |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request validation failed. The message is shown to the client.
    #[error("invalid request: {message}")]
    Validation {
        /// Originating area.
        area: Area,
        /// Client-safe description of what is wrong.
        message: String,
    },

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("forbidden: {detail}")]
    Forbidden {
        /// Originating area.
        area: Area,
        /// Internal detail.
        detail: String,
    },

    /// A plan limit was reached. The message is shown to the client.
    #[error("plan limit exceeded: {message}")]
    LimitExceeded {
        /// Originating area.
        area: Area,
        /// Client-safe description naming the limit and plan.
        message: String,
    },

    /// Entity does not exist.
    #[error("not found: {detail}")]
    NotFound {
        /// Originating area.
        area: Area,
        /// Internal detail.
        detail: String,
    },

    /// Unique constraint or state conflict.
    #[error("conflict: {detail}")]
    Conflict {
        /// Originating area.
        area: Area,
        /// Internal detail.
        detail: String,
    },

    /// Entity existed but expired.
    #[error("gone: {detail}")]
    Gone {
        /// Originating area.
        area: Area,
        /// Internal detail.
        detail: String,
    },

    /// Client exceeded the rate limit.
    #[error("rate limit exceeded; retry after {retry_after_ms} ms")]
    RateLimited {
        /// Milliseconds until the client may retry.
        retry_after_ms: u64,
    },

    /// An outbound service failed.
    #[error("upstream {service} failed: {detail}")]
    Upstream {
        /// Originating area.
        area: Area,
        /// Service name, e.g. `"tmdb"`.
        service: &'static str,
        /// Internal detail.
        detail: String,
    },

    /// An optional integration is not configured.
    #[error("{service} is not configured")]
    Unavailable {
        /// Originating area.
        area: Area,
        /// Service name.
        service: &'static str,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for [`AppError::Validation`].
    pub fn invalid(area: Area, message: impl Into<String>) -> Self {
        Self::Validation {
            area,
            message: message.into(),
        }
    }

    /// Shorthand for [`AppError::Forbidden`].
    pub fn forbidden(area: Area, detail: impl Into<String>) -> Self {
        Self::Forbidden {
            area,
            detail: detail.into(),
        }
    }

    /// Shorthand for [`AppError::NotFound`].
    pub fn not_found(area: Area, detail: impl Into<String>) -> Self {
        Self::NotFound {
            area,
            detail: detail.into(),
        }
    }

    /// Shorthand for [`AppError::Conflict`].
    pub fn conflict(area: Area, detail: impl Into<String>) -> Self {
        Self::Conflict {
            area,
            detail: detail.into(),
        }
    }

    /// Shorthand for [`AppError::Gone`].
    pub fn gone(area: Area, detail: impl Into<String>) -> Self {
        Self::Gone {
            area,
            detail: detail.into(),
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } | Self::LimitExceeded { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Gone { .. } => StatusCode::GONE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the feature area this error belongs to.
    #[must_use]
    pub const fn area(&self) -> Area {
        match self {
            Self::Validation { area, .. }
            | Self::Forbidden { area, .. }
            | Self::LimitExceeded { area, .. }
            | Self::NotFound { area, .. }
            | Self::Conflict { area, .. }
            | Self::Gone { area, .. }
            | Self::Upstream { area, .. }
            | Self::Unavailable { area, .. } => *area,
            Self::Unauthorized(_) => Area::Auth,
            Self::RateLimited { .. } | Self::Persistence(_) | Self::Internal(_) => Area::General,
        }
    }

    /// Returns the variant name used as `error` outside production.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden { .. } => "Forbidden",
            Self::LimitExceeded { .. } => "LimitExceeded",
            Self::NotFound { .. } => "NotFound",
            Self::Conflict { .. } => "Conflict",
            Self::Gone { .. } => "Gone",
            Self::RateLimited { .. } => "RateLimited",
            Self::Upstream { .. } => "UpstreamError",
            Self::Unavailable { .. } => "ServiceUnavailable",
            Self::Persistence(_) => "PersistenceError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Returns the message shown to clients.
    #[must_use]
    pub fn client_message(&self) -> Cow<'static, str> {
        match self {
            Self::Validation { message, .. } | Self::LimitExceeded { message, .. } => {
                Cow::Owned(message.clone())
            }
            _ => Cow::Borrowed(messages::lookup(self.area(), self.status_code())),
        }
    }

    /// Builds the [`ErrorReport`] carried to the error envelope.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            status: self.status_code(),
            kind: self.kind(),
            message: self.client_message().into_owned(),
            detail: self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = self.report();
        let mut response = axum::Json(report.render("", true)).into_response();
        *response.status_mut() = report.status;
        if let Self::RateLimited { retry_after_ms } = self {
            let secs = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response.extensions_mut().insert(report);
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::invalid(Area::Rooms, "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::forbidden(Area::Rooms, "x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found(Area::Rooms, "x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::gone(Area::Rooms, "x").status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_uses_area_message() {
        let err = AppError::not_found(Area::Rooms, "room ABC123");
        assert_eq!(
            err.client_message(),
            messages::lookup(Area::Rooms, StatusCode::NOT_FOUND)
        );
        assert!(!err.client_message().contains("ABC123"));
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = AppError::invalid(Area::Swipes, "movieId must not be empty");
        assert_eq!(err.client_message(), "movieId must not be empty");
    }

    #[test]
    fn production_render_hides_detail() {
        let report = AppError::Persistence("connection refused for user@example.com".into()).report();
        let body = report.render("/api/v1/rooms", true);
        assert_eq!(body.status_code, 500);
        assert_eq!(body.error, "Internal Server Error");
        assert_eq!(body.path, "/api/v1/rooms");
        assert!(body.detail.is_none());
    }

    #[test]
    fn development_render_sanitises_detail() {
        let report = AppError::Persistence("connection refused for user@example.com".into()).report();
        let body = report.render("/api/v1/rooms", false);
        assert_eq!(body.error, "PersistenceError");
        let Some(detail) = body.detail else {
            panic!("expected detail outside production");
        };
        assert!(!detail.contains("user@example.com"));
        assert!(detail.contains("[EMAIL]"));
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_ms: 1500,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let Some(value) = response.headers().get(axum::http::header::RETRY_AFTER) else {
            panic!("missing Retry-After");
        };
        assert_eq!(value, "2");
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
