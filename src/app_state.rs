//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::middleware::RateLimiter;
use crate::clients::Clients;
use crate::config::AppConfig;
use crate::persistence::Store;
use crate::service::{
    AuthService, CatalogService, MatchService, NotificationService, RoomService,
    SubscriptionService, SwipeService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Storage backend, for health checks.
    pub store: Arc<dyn Store>,
    /// Sign-in and tokens.
    pub auth: Arc<AuthService>,
    /// Rooms and membership.
    pub rooms: Arc<RoomService>,
    /// Swipes and match detection.
    pub swipes: Arc<SwipeService>,
    /// Match listing.
    pub matches: Arc<MatchService>,
    /// Plans, limits and billing.
    pub subscriptions: Arc<SubscriptionService>,
    /// Candidate titles and genres.
    pub catalog: Arc<CatalogService>,
    /// Per-client request budget.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires every service on top of `store` and `clients`.
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn Store>, clients: Clients) -> Self {
        let subscriptions = SubscriptionService::new(Arc::clone(&store), clients.billing);
        let rooms = RoomService::new(
            Arc::clone(&store),
            subscriptions.clone(),
            config.room_code_length,
        );
        let matches = MatchService::new(Arc::clone(&store), rooms.clone());
        let notifications = NotificationService::new(
            Arc::clone(&store),
            subscriptions.clone(),
            clients.email,
            &config.email_from,
            &config.public_app_url,
        );
        let swipes = SwipeService::new(
            Arc::clone(&store),
            rooms.clone(),
            subscriptions.clone(),
            matches.clone(),
            notifications,
        );
        let catalog = CatalogService::new(Arc::clone(&store), rooms.clone(), clients.catalog);
        let auth = AuthService::new(Arc::clone(&store), &config.jwt_secret, config.jwt_ttl_hours);
        let rate_limiter =
            RateLimiter::new(config.rate_limit_per_minute, config.rate_limit_burst);

        Self {
            config: Arc::new(config),
            store,
            auth: Arc::new(auth),
            rooms: Arc::new(rooms),
            swipes: Arc::new(swipes),
            matches: Arc::new(matches),
            subscriptions: Arc::new(subscriptions),
            catalog: Arc::new(catalog),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
