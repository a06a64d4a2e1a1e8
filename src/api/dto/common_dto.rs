//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, Area};

/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 100;

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (1–100). Defaults to 20.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl PaginationParams {
    /// Checks the bounds and returns the `(offset, limit)` window.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `page` is 0 or `limit` is
    /// outside `1..=100`.
    pub fn window(&self, area: Area) -> Result<(u64, u64), AppError> {
        if self.page < 1 {
            return Err(AppError::invalid(area, "page must be at least 1"));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(AppError::invalid(
                area,
                format!("limit must be between 1 and {MAX_LIMIT}"),
            ));
        }
        let offset = u64::from(self.page - 1) * u64::from(self.limit);
        Ok((offset, u64::from(self.limit)))
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
    /// Total number of items.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether a later page exists.
    pub has_next_page: bool,
    /// Whether an earlier page exists.
    pub has_previous_page: bool,
}

impl PaginationMeta {
    /// Builds the metadata for `total` items.
    #[must_use]
    pub fn new(params: PaginationParams, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(params.limit.max(1)));
        Self {
            page: params.page,
            limit: params.limit,
            total,
            total_pages,
            has_next_page: u64::from(params.page) < total_pages,
            has_previous_page: params.page > 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn params(page: u32, limit: u32) -> PaginationParams {
        PaginationParams { page, limit }
    }

    #[test]
    fn window_computes_offset() {
        assert_eq!(params(1, 20).window(Area::Rooms).ok(), Some((0, 20)));
        assert_eq!(params(3, 10).window(Area::Rooms).ok(), Some((20, 10)));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(params(0, 20).window(Area::Rooms).is_err());
        assert!(params(1, 0).window(Area::Rooms).is_err());
        assert!(params(1, 101).window(Area::Rooms).is_err());
        assert!(params(1, 100).window(Area::Rooms).is_ok());
    }

    #[test]
    fn meta_flags() {
        let meta = PaginationMeta::new(params(2, 10), 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_previous_page);

        let last = PaginationMeta::new(params(3, 10), 25);
        assert!(!last.has_next_page);

        let empty = PaginationMeta::new(params(1, 20), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_previous_page);
    }

    #[test]
    fn meta_serializes_camel_case() {
        let Ok(json) = serde_json::to_value(PaginationMeta::new(params(1, 20), 5)) else {
            panic!("meta should serialize");
        };
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["hasNextPage"], false);
    }
}
