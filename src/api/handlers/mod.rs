//! REST endpoint handlers organized by resource.

pub mod auth;
pub mod matches;
pub mod movie;
pub mod room;
pub mod subscription;
pub mod swipe;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(room::routes())
        .merge(swipe::routes())
        .merge(matches::routes())
        .merge(movie::routes())
        .merge(subscription::routes())
}
