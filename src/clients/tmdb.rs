//! Movie catalog client (TMDB v3 API).
//!
//! Only the two calls the API needs: `discover` for room candidates and the
//! genre lists. Requests go through [`retry_with_backoff`]; transport
//! errors, 429 and 5xx are retried, other statuses fail at once.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::retry::{Attempt, RetryPolicy, retry_with_backoff};
use crate::domain::{MediaType, RoomFilters};
use crate::error::{AppError, Area};

const SERVICE: &str = "tmdb";

/// A candidate title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTitle {
    /// Catalog id as a string; used as `movieId` in swipes.
    pub id: String,
    /// Movie or series.
    pub media_type: MediaType,
    /// Display title.
    pub title: String,
    /// Plot summary.
    pub overview: String,
    /// Poster path relative to the image CDN.
    pub poster_path: Option<String>,
    /// Backdrop path relative to the image CDN.
    pub backdrop_path: Option<String>,
    /// First release or air date, `YYYY-MM-DD`.
    pub release_date: Option<String>,
    /// Average rating, 0–10.
    pub vote_average: f32,
    /// Genre ids.
    pub genre_ids: Vec<u32>,
}

/// One page of discover results.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    /// 1-based page number.
    pub page: u32,
    /// Pages available.
    pub total_pages: u32,
    /// Titles available.
    pub total_results: u64,
    /// Titles on this page.
    pub results: Vec<CatalogTitle>,
}

/// A catalog genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Genre {
    /// Genre id used in room filters.
    pub id: u32,
    /// Localised name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    results: Vec<RawTitle>,
}

#[derive(Debug, Deserialize)]
struct RawTitle {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    overview: String,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

impl RawTitle {
    fn into_title(self, media_type: MediaType) -> CatalogTitle {
        CatalogTitle {
            id: self.id.to_string(),
            media_type,
            title: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            release_date: self
                .release_date
                .or(self.first_air_date)
                .filter(|d| !d.is_empty()),
            vote_average: self.vote_average,
            genre_ids: self.genre_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGenres {
    #[serde(default)]
    genres: Vec<Genre>,
}

/// HTTP client for the movie catalog.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    policy: RetryPolicy,
}

impl TmdbClient {
    /// Creates a client for `base_url` (e.g. `https://api.themoviedb.org/3`).
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        language: &str,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
            policy,
        }
    }

    /// Fetches one page of titles matching `filters`, most popular first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`] if the catalog fails after retries.
    pub async fn discover(
        &self,
        filters: &RoomFilters,
        page: u32,
    ) -> Result<CatalogPage, AppError> {
        let media_type = filters.media_type();
        let mut query = discover_query(filters);
        query.push(("page".to_string(), page.to_string()));

        let raw: RawPage = self
            .get_json(&format!("/discover/{}", media_type.as_str()), query)
            .await?;

        Ok(CatalogPage {
            page: raw.page.max(page),
            total_pages: raw.total_pages,
            total_results: raw.total_results,
            results: raw
                .results
                .into_iter()
                .map(|t| t.into_title(media_type))
                .collect(),
        })
    }

    /// Lists genres for `media_type`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`] if the catalog fails after retries.
    pub async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, AppError> {
        let raw: RawGenres = self
            .get_json(&format!("/genre/{}/list", media_type.as_str()), Vec::new())
            .await?;
        Ok(raw.genres)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(String, String)>,
    ) -> Result<T, AppError> {
        let url = format!("{}{path}", self.base_url);
        query.push(("api_key".to_string(), self.api_key.clone()));
        query.push(("language".to_string(), self.language.clone()));

        retry_with_backoff(self.policy, |_| {
            let request = self.http.get(&url).query(&query);
            async move {
                let response = match request.send().await {
                    Ok(response) => response,
                    Err(e) => return Attempt::Retry(upstream(format!("transport: {e}"))),
                };
                let status = response.status();
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    return Attempt::Retry(upstream(format!("status {status}")));
                }
                if !status.is_success() {
                    return Attempt::Fail(upstream(format!("status {status}")));
                }
                match response.json::<T>().await {
                    Ok(body) => Attempt::Done(body),
                    Err(e) => Attempt::Fail(upstream(format!("invalid body: {e}"))),
                }
            }
        })
        .await
    }
}

fn upstream(detail: String) -> AppError {
    AppError::Upstream {
        area: Area::Movies,
        service: SERVICE,
        detail,
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Translates room filters into discover query parameters.
fn discover_query(filters: &RoomFilters) -> Vec<(String, String)> {
    let mut query = vec![("sort_by".to_string(), "popularity.desc".to_string())];
    let mut push = |key: &str, value: String| query.push((key.to_string(), value));

    let date_field = match filters.media_type() {
        MediaType::Movie => "primary_release_date",
        MediaType::Tv => "first_air_date",
    };

    if !filters.genres.is_empty() {
        push("with_genres", join_ids(&filters.genres));
    }
    if let Some(min) = filters.min_rating {
        push("vote_average.gte", min.to_string());
    }
    if let Some(max) = filters.max_rating {
        push("vote_average.lte", max.to_string());
    }
    if let Some(year) = filters.min_year {
        push(&format!("{date_field}.gte"), format!("{year}-01-01"));
    }
    if let Some(year) = filters.max_year {
        push(&format!("{date_field}.lte"), format!("{year}-12-31"));
    }
    if let Some(min) = filters.min_runtime {
        push("with_runtime.gte", min.to_string());
    }
    if let Some(max) = filters.max_runtime {
        push("with_runtime.lte", max.to_string());
    }
    if !filters.watch_providers.is_empty() {
        push("with_watch_providers", join_ids(&filters.watch_providers));
    }
    if let Some(region) = &filters.region {
        push("watch_region", region.to_ascii_uppercase());
        push("region", region.to_ascii_uppercase());
    }
    if let Some(language) = &filters.language {
        push("with_original_language", language.to_ascii_lowercase());
    }
    query
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, retries: u32) -> TmdbClient {
        TmdbClient::new(
            reqwest::Client::new(),
            &server.uri(),
            "test-key",
            "en-US",
            RetryPolicy::new(retries, Duration::from_millis(1)),
        )
    }

    #[test]
    fn query_uses_tv_date_fields() {
        let filters = RoomFilters {
            media_type: Some(MediaType::Tv),
            min_year: Some(2010),
            genres: vec![18, 35],
            ..RoomFilters::default()
        };
        let query = discover_query(&filters);
        assert!(query.contains(&("first_air_date.gte".to_string(), "2010-01-01".to_string())));
        assert!(query.contains(&("with_genres".to_string(), "18|35".to_string())));
    }

    #[tokio::test]
    async fn discover_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discover/movie"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("with_genres", "28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "total_pages": 3,
                "total_results": 60,
                "results": [{
                    "id": 550,
                    "title": "Fight Club",
                    "overview": "An insomniac office worker...",
                    "poster_path": "/poster.jpg",
                    "release_date": "1999-10-15",
                    "vote_average": 8.4,
                    "genre_ids": [18]
                }]
            })))
            .mount(&server)
            .await;

        let filters = RoomFilters {
            genres: vec![28],
            ..RoomFilters::default()
        };
        let Ok(page) = client(&server, 0).discover(&filters, 1).await else {
            panic!("discover should succeed");
        };
        assert_eq!(page.total_pages, 3);
        let Some(first) = page.results.first() else {
            panic!("expected one result");
        };
        assert_eq!(first.id, "550");
        assert_eq!(first.title, "Fight Club");
        assert_eq!(first.release_date.as_deref(), Some("1999-10-15"));
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = client(&server, 2).genres(MediaType::Movie).await;
        assert!(matches!(result, Err(AppError::Upstream { .. })));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/tv/list"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server, 3).genres(MediaType::Tv).await;
        assert!(matches!(result, Err(AppError::Upstream { .. })));
    }

    #[tokio::test]
    async fn genres_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "genres": [{"id": 28, "name": "Action"}, {"id": 35, "name": "Comedy"}]
            })))
            .mount(&server)
            .await;

        let Ok(genres) = client(&server, 0).genres(MediaType::Movie).await else {
            panic!("genres should parse");
        };
        assert_eq!(genres.len(), 2);
    }
}
