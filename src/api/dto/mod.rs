//! Data Transfer Objects for REST request/response serialization.
//!
//! All JSON field names are camelCase. Ids are plain UUIDs on the wire.

pub mod auth_dto;
pub mod common_dto;
pub mod match_dto;
pub mod movie_dto;
pub mod room_dto;
pub mod subscription_dto;
pub mod swipe_dto;

pub use auth_dto::*;
pub use common_dto::*;
pub use match_dto::*;
pub use movie_dto::*;
pub use room_dto::*;
pub use subscription_dto::*;
pub use swipe_dto::*;
