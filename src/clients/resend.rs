//! Transactional e-mail (Resend API).

use serde::Serialize;

use crate::error::{AppError, Area};

const SERVICE: &str = "resend";

/// An outgoing e-mail.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    /// Sender, e.g. `Swipe Movie <noreply@swipe.movie>`.
    pub from: String,
    /// Recipients.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Resend HTTP client.
#[derive(Debug, Clone)]
pub struct ResendClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl ResendClient {
    /// Creates a client for `api_base` (e.g. `https://api.resend.com`).
    #[must_use]
    pub fn new(http: reqwest::Client, api_base: &str, api_key: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Sends `email`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`] on transport failure or a non-success
    /// status.
    pub async fn send(&self, email: &Email) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| upstream(format!("transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream(format!("status {status}: {body}")));
        }
        Ok(())
    }
}

fn upstream(detail: String) -> AppError {
    AppError::Upstream {
        area: Area::General,
        service: SERVICE,
        detail,
    }
}
