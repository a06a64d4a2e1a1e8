//! Service layer: business logic orchestration.
//!
//! Services combine the pure rules in [`crate::domain`] with the
//! [`crate::persistence::Store`] and the outbound [`crate::clients`].
//! They are cheap to clone; each holds an `Arc<dyn Store>`.

pub mod auth;
pub mod catalog;
pub mod matches;
pub mod notification;
pub mod room;
pub mod subscription;
pub mod swipe;

pub use auth::{AuthService, Claims, IssuedToken};
pub use catalog::CatalogService;
pub use matches::MatchService;
pub use notification::NotificationService;
pub use room::{CreateRoom, RoomService};
pub use subscription::{SubscriptionService, UsageReport};
pub use swipe::{SwipeOutcome, SwipeService};
