//! Client-facing error messages keyed by feature area and status.

use axum::http::StatusCode;

use super::Area;

/// Returns the message for `(area, status)`, falling back to
/// [`generic`] when the area has no specific wording.
#[must_use]
pub fn lookup(area: Area, status: StatusCode) -> &'static str {
    match (area, status.as_u16()) {
        (Area::Rooms, 400) => "The room request is invalid.",
        (Area::Rooms, 403) => "You do not have access to this room.",
        (Area::Rooms, 404) => "Room not found. Check the code and try again.",
        (Area::Rooms, 409) => "Could not create the room right now. Please try again.",
        (Area::Rooms, 410) => "This room has expired.",

        (Area::Auth, 401) => "Your session is invalid or has expired. Please sign in again.",
        (Area::Auth, 403) => "You are not allowed to perform this action.",
        (Area::Auth, 404) => "User not found.",

        (Area::Movies, 404) => "Movie not found.",
        (Area::Movies, 502) => {
            "The movie catalog is temporarily unavailable. Please try again later."
        }
        (Area::Movies, 503) => "The movie catalog is not available on this server.",

        (Area::Swipes, 403) => "You cannot swipe in this room.",
        (Area::Swipes, 404) => "Swipe not found.",
        (Area::Swipes, 410) => "This room has expired; swiping is closed.",

        (Area::Matches, 403) => "You cannot view matches for this room.",
        (Area::Matches, 404) => "Room not found.",
        (Area::Matches, 410) => "This room has expired.",

        (Area::Subscriptions, 404) => "No subscription found for this account.",
        (Area::Subscriptions, 502) => "The billing provider is temporarily unavailable.",
        (Area::Subscriptions, 503) => "Billing is not available on this server.",

        _ => generic(status),
    }
}

/// Generic message for a status code.
#[must_use]
pub fn generic(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad request.",
        401 => "Authentication required.",
        403 => "Access denied.",
        404 => "Resource not found.",
        405 => "Method not allowed.",
        409 => "The resource already exists.",
        410 => "The resource is no longer available.",
        413 => "Request body too large.",
        415 => "Unsupported media type.",
        422 => "The request could not be processed.",
        429 => "Too many requests. Please slow down.",
        502 => "An upstream service failed. Please try again later.",
        503 => "Service unavailable.",
        504 => "The request timed out.",
        s if s >= 500 => "Internal server error.",
        _ => "The request failed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_specific_message_wins() {
        assert_eq!(
            lookup(Area::Rooms, StatusCode::GONE),
            "This room has expired."
        );
    }

    #[test]
    fn falls_back_to_generic() {
        assert_eq!(
            lookup(Area::Matches, StatusCode::CONFLICT),
            generic(StatusCode::CONFLICT)
        );
        assert_eq!(
            lookup(Area::General, StatusCode::INTERNAL_SERVER_ERROR),
            "Internal server error."
        );
    }

    #[test]
    fn unknown_server_status_is_internal() {
        assert_eq!(generic(StatusCode::NOT_IMPLEMENTED), "Internal server error.");
    }
}
