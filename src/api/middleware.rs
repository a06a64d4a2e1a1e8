//! Cross-cutting HTTP middleware: the error envelope and rate limiting.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::app_state::AppState;
use crate::error::sanitize::sanitize;
use crate::error::{AppError, ErrorReport};

/// Largest error body read back when wrapping a framework response.
const MAX_ERROR_BODY: usize = 16 * 1024;

/// Buckets idle this long are dropped when the table grows.
const BUCKET_IDLE: Duration = Duration::from_secs(600);

const PRUNE_THRESHOLD: usize = 10_000;

/// Renders every 4xx/5xx response as an [`crate::error::ErrorResponse`].
///
/// Handler errors carry an [`ErrorReport`] extension. Anything else
/// (extractor rejections, unknown routes, 405s, timeouts, caught panics)
/// is wrapped using its status and body text. Framework 422s become 400s.
pub async fn render_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let report = match parts.extensions.remove::<ErrorReport>() {
        Some(report) => report,
        None => {
            let text = axum::body::to_bytes(body, MAX_ERROR_BODY)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
                .unwrap_or_default();
            let status = if status == StatusCode::UNPROCESSABLE_ENTITY {
                StatusCode::BAD_REQUEST
            } else {
                status
            };
            let detail = if text.is_empty() {
                status.to_string()
            } else {
                text
            };
            ErrorReport::from_status(status, detail)
        }
    };

    if report.status.is_server_error() {
        tracing::error!(
            %method,
            path = %path,
            status = report.status.as_u16(),
            kind = report.kind,
            detail = %sanitize(&report.detail),
            "request failed"
        );
    } else {
        tracing::debug!(
            %method,
            path = %path,
            status = report.status.as_u16(),
            kind = report.kind,
            detail = %sanitize(&report.detail),
            "request rejected"
        );
    }

    let body = report.render(&path, state.config.is_production());
    let mut rendered = (report.status, Json(body)).into_response();
    for (name, value) in &parts.headers {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Rejects clients that exhausted their token bucket with 429.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);
    if let Err(retry_after_ms) = state.rate_limiter.check(&key) {
        tracing::debug!(client = %key, retry_after_ms, "rate limited");
        return AppError::RateLimited { retry_after_ms }.into_response();
    }
    next.run(request).await
}

/// First `X-Forwarded-For` address, else the peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    updated: Instant,
}

/// Per-client token buckets.
///
/// Each client holds up to `burst` tokens and regains `per_minute / 60`
/// per second. A request spends one token.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    /// Creates a limiter. `per_minute == 0` disables limiting.
    #[must_use]
    pub fn new(per_minute: u32, burst: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: f64::from(burst.max(1)),
            refill_per_sec: f64::from(per_minute) / 60.0,
        }
    }

    /// Spends a token for `key`.
    ///
    /// # Errors
    ///
    /// Returns the milliseconds until a token is available when the
    /// bucket is empty.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        if self.refill_per_sec <= 0.0 {
            return Ok(());
        }
        let now = Instant::now();
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.buckets
                .retain(|_, b| now.duration_since(b.updated) < BUCKET_IDLE);
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            updated: now,
        });
        let elapsed = now.duration_since(bucket.updated).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.updated = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }
        let wait_secs = (1.0 - bucket.tokens) / self.refill_per_sec;
        Err((wait_secs * 1000.0).ceil() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_reject() {
        let limiter = RateLimiter::new(60, 3);
        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").is_ok());
        }
        let Err(wait) = limiter.check("1.2.3.4") else {
            panic!("fourth request should be limited");
        };
        assert!(wait > 0 && wait <= 1000, "{wait}");
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(60, 1);
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        assert!(limiter.check("b").is_ok());
    }

    #[test]
    fn zero_rate_disables_limiting() {
        let limiter = RateLimiter::new(0, 1);
        for _ in 0..100 {
            assert!(limiter.check("a").is_ok());
        }
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(axum::body::Body::empty());
        let Ok(request) = request else {
            panic!("request should build");
        };
        assert_eq!(client_key(&request), "203.0.113.7");
    }
}
