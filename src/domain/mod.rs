//! Domain layer: entities, identifiers and the pure rules around them.
//!
//! Room codes, plan limits and the match threshold are plain functions
//! with no I/O; the services in [`crate::service`] combine them with the
//! [`crate::persistence::Store`].

pub mod ids;
pub mod matching;
pub mod models;
pub mod plan;
pub mod room_code;

pub use ids::{RoomId, UserId};
pub use models::{
    Match, MediaType, NewRoom, Room, RoomFilters, RoomMember, Subscription, SubscriptionStatus,
    SubscriptionUpsert, Swipe, User,
};
pub use plan::{FeatureLimits, Plan};
