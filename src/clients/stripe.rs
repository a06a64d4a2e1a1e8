//! Billing portal sessions (Stripe API).

use serde::Deserialize;

use crate::error::{AppError, Area};

const SERVICE: &str = "stripe";

#[derive(Debug, Deserialize)]
struct PortalSession {
    url: String,
}

/// Minimal Stripe client: creates customer billing-portal sessions.
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    /// Creates a client for `api_base` (e.g. `https://api.stripe.com`).
    #[must_use]
    pub fn new(http: reqwest::Client, api_base: &str, secret_key: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Creates a billing-portal session for `customer_id` and returns its
    /// URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`] on transport failure, a non-success
    /// status or an unreadable body.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/billing_portal/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[("customer", customer_id), ("return_url", return_url)])
            .send()
            .await
            .map_err(|e| upstream(format!("transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream(format!("status {status}: {body}")));
        }

        let session: PortalSession = response
            .json()
            .await
            .map_err(|e| upstream(format!("invalid body: {e}")))?;
        tracing::debug!(customer_id, "billing portal session created");
        Ok(session.url)
    }
}

fn upstream(detail: String) -> AppError {
    AppError::Upstream {
        area: Area::Subscriptions,
        service: SERVICE,
        detail,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn portal_session_returns_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/billing_portal/sessions"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("customer=cus_42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "bps_1",
                "url": "https://billing.stripe.com/session/abc"
            })))
            .mount(&server)
            .await;

        let client = StripeClient::new(reqwest::Client::new(), &server.uri(), "sk_test_123");
        let Ok(url) = client
            .create_portal_session("cus_42", "http://localhost:3001/settings")
            .await
        else {
            panic!("session should be created");
        };
        assert_eq!(url, "https://billing.stripe.com/session/abc");
    }

    #[tokio::test]
    async fn error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/billing_portal/sessions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "No such customer"}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::new(reqwest::Client::new(), &server.uri(), "sk_test_123");
        let result = client.create_portal_session("cus_missing", "http://x").await;
        assert!(matches!(
            result,
            Err(AppError::Upstream {
                service: "stripe",
                ..
            })
        ));
    }
}
