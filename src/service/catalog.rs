//! Candidate titles for rooms, from the movie catalog.

use std::collections::HashSet;
use std::sync::Arc;

use super::RoomService;
use crate::clients::{CatalogPage, Genre, TmdbClient};
use crate::domain::{MediaType, RoomId, UserId};
use crate::error::{AppError, Area};
use crate::persistence::Store;

/// Highest page the catalog serves.
pub const MAX_CATALOG_PAGE: u32 = 500;

/// Fetches candidates and genres; unavailable without a catalog key.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    rooms: RoomService,
    catalog: Option<TmdbClient>,
}

impl CatalogService {
    /// Creates a new `CatalogService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, rooms: RoomService, catalog: Option<TmdbClient>) -> Self {
        Self {
            store,
            rooms,
            catalog,
        }
    }

    fn client(&self) -> Result<&TmdbClient, AppError> {
        self.catalog.as_ref().ok_or(AppError::Unavailable {
            area: Area::Movies,
            service: "tmdb",
        })
    }

    /// One page of titles matching the room's filters, without those the
    /// caller already swiped in that room.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a page outside `1..=500`.
    /// - Room errors as for membership checks.
    /// - [`AppError::Unavailable`] / [`AppError::Upstream`] from the
    ///   catalog.
    pub async fn candidates(
        &self,
        user: UserId,
        room_id: RoomId,
        page: u32,
    ) -> Result<CatalogPage, AppError> {
        if !(1..=MAX_CATALOG_PAGE).contains(&page) {
            return Err(AppError::invalid(
                Area::Movies,
                format!("page must be between 1 and {MAX_CATALOG_PAGE}"),
            ));
        }
        let client = self.client()?;
        let room = self
            .rooms
            .active_room_for_member(room_id, user, Area::Movies)
            .await?;

        let swiped: HashSet<String> = self
            .store
            .list_user_swipes(room.id, user)
            .await?
            .into_iter()
            .map(|s| s.movie_id)
            .collect();

        let mut result = client.discover(&room.filters, page).await?;
        let before = result.results.len();
        result.results.retain(|t| !swiped.contains(&t.id));
        tracing::debug!(
            %room_id,
            page,
            fetched = before,
            returned = result.results.len(),
            "candidates loaded"
        );
        Ok(result)
    }

    /// Catalog genres for `media_type`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] or [`AppError::Upstream`].
    pub async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, AppError> {
        self.client()?.genres(media_type).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::clients::RetryPolicy;
    use crate::service::{CreateRoom, SubscriptionService};
    use crate::persistence::MemoryStore;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(store: &Arc<dyn Store>, catalog: Option<TmdbClient>) -> (CatalogService, RoomService) {
        let subscriptions = SubscriptionService::new(Arc::clone(store), None);
        let rooms = RoomService::new(Arc::clone(store), subscriptions, 6);
        (
            CatalogService::new(Arc::clone(store), rooms.clone(), catalog),
            rooms,
        )
    }

    #[tokio::test]
    async fn missing_catalog_is_unavailable() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (catalog, _) = service(&store, None);
        assert!(matches!(
            catalog.genres(MediaType::Movie).await,
            Err(AppError::Unavailable { .. })
        ));
        assert!(matches!(
            catalog.candidates(UserId::new(), RoomId::new(), 0).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn candidates_skip_swiped_titles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "total_pages": 1,
                "total_results": 2,
                "results": [
                    {"id": 550, "title": "Fight Club", "vote_average": 8.4},
                    {"id": 551, "title": "Another", "vote_average": 6.1}
                ]
            })))
            .mount(&server)
            .await;

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let client = TmdbClient::new(
            reqwest::Client::new(),
            &server.uri(),
            "key",
            "en-US",
            RetryPolicy::new(0, Duration::from_millis(1)),
        );
        let (catalog, rooms) = service(&store, Some(client));
        let Ok(owner) = store.upsert_user("owner@example.com", None).await else {
            panic!("user should be created");
        };
        let Ok(room) = rooms
            .create(
                owner.id,
                CreateRoom {
                    name: "Friday".to_string(),
                    ..CreateRoom::default()
                },
            )
            .await
        else {
            panic!("room should be created");
        };
        let _ = store.upsert_swipe(room.id, owner.id, "550", true).await;

        let Ok(page) = catalog.candidates(owner.id, room.id, 1).await else {
            panic!("candidates should load");
        };
        let ids: Vec<&str> = page.results.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["551"]);
    }
}
