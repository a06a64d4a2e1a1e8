//! Catalog query parameters.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::MediaType;

/// Query for `GET /movies/rooms/{roomId}/candidates`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CandidatesQuery {
    /// Catalog page (1–500). Defaults to 1.
    #[serde(default)]
    pub page: Option<u32>,
}

/// Query for `GET /movies/genres`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenresQuery {
    /// `movie` (default) or `tv`.
    #[serde(default, rename = "type")]
    pub media_type: Option<MediaType>,
}
