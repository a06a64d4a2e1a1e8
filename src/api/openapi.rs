//! OpenAPI document and the Swagger UI mount.

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth, matches, movie, room, subscription, swipe, system};
use crate::app_state::AppState;
use crate::error::ErrorResponse;

/// Path of the generated OpenAPI JSON.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// The API description served at [`OPENAPI_PATH`].
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Swipe Movie API",
        description = "Rooms where groups swipe on movies and series until enough of them like the same title."
    ),
    modifiers(&BearerAuth),
    paths(
        auth::oauth_upsert,
        auth::login_oauth,
        auth::me,
        room::create_room,
        room::join_room,
        room::my_rooms,
        room::room_by_code,
        room::room_members,
        room::leave_room,
        room::delete_room,
        swipe::create_swipe,
        swipe::undo_swipe,
        swipe::my_swipes,
        matches::room_matches,
        movie::candidates,
        movie::genres,
        subscription::my_subscription,
        subscription::my_limits,
        subscription::upsert_subscription,
        subscription::cancel_subscription,
        subscription::portal_session,
        subscription::list_plans,
        system::health_handler,
    ),
    components(schemas(ErrorResponse)),
    tags(
        (name = "Auth", description = "Sign-in and the current user"),
        (name = "Rooms", description = "Rooms and membership"),
        (name = "Swipes", description = "Votes on titles"),
        (name = "Matches", description = "Titles a room agreed on"),
        (name = "Movies", description = "Candidate titles from the movie catalog"),
        (name = "Subscriptions", description = "Plans, limits and billing"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .build();
            components.add_security_scheme("bearer", SecurityScheme::Http(scheme));
        }
    }
}

/// Serves the document, with Swagger UI at `/swagger-ui` when the
/// `swagger-ui` feature is on.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()))
}

/// Serves the document.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
