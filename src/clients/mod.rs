//! Outbound HTTP clients: movie catalog, billing portal and e-mail.
//!
//! Each client is optional; [`Clients::from_config`] builds only those
//! whose API key is configured and shares one `reqwest::Client` between
//! them.

pub mod resend;
pub mod retry;
pub mod stripe;
pub mod tmdb;

use std::time::Duration;

pub use resend::{Email, ResendClient};
pub use retry::RetryPolicy;
pub use stripe::StripeClient;
pub use tmdb::{CatalogPage, CatalogTitle, Genre, TmdbClient};

use crate::config::AppConfig;
use crate::error::AppError;

/// The configured outbound clients.
#[derive(Debug, Clone, Default)]
pub struct Clients {
    /// Movie catalog.
    pub catalog: Option<TmdbClient>,
    /// Billing portal.
    pub billing: Option<StripeClient>,
    /// E-mail.
    pub email: Option<ResendClient>,
}

impl Clients {
    /// Builds the clients enabled in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("swipe-movie-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;

        let catalog = config.tmdb_api_key.as_deref().map(|key| {
            TmdbClient::new(
                http.clone(),
                &config.tmdb_base_url,
                key,
                &config.tmdb_language,
                RetryPolicy::new(
                    config.catalog_max_retries,
                    Duration::from_millis(config.catalog_retry_base_ms),
                ),
            )
        });
        let billing = config
            .stripe_secret_key
            .as_deref()
            .map(|key| StripeClient::new(http.clone(), &config.stripe_api_base, key));
        let email = config
            .resend_api_key
            .as_deref()
            .map(|key| ResendClient::new(http.clone(), &config.resend_api_base, key));

        tracing::info!(
            catalog = catalog.is_some(),
            billing = billing.is_some(),
            email = email.is_some(),
            "outbound clients configured"
        );
        Ok(Self {
            catalog,
            billing,
            email,
        })
    }
}
