//! # swipe-movie-api
//!
//! REST backend for Swipe Movie: a group opens a room, everyone swipes on
//! movie and series candidates, and a title the room likes enough becomes
//! a match.
//!
//! Users arrive through the web frontend's OAuth flow, which calls the
//! internal endpoints to upsert them and obtain a bearer token. Plans
//! (FREE, STARTER, PRO, TEAM) cap rooms, participants and swipes and gate
//! advanced filters and match e-mails. The movie catalog, billing portal
//! and e-mail provider are optional HTTP integrations.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── Middleware (api/middleware): error envelope, rate limit
//!     ├── REST Handlers (api/handlers)
//!     │
//!     ├── Services (service/): auth, rooms, swipes, matches,
//!     │                        subscriptions, catalog, notifications
//!     ├── Domain rules (domain/): plans, room codes, match threshold
//!     │
//!     ├── Store (persistence/): PostgreSQL or in-memory
//!     └── Outbound clients (clients/): movie catalog, billing, e-mail
//! ```

pub mod api;
pub mod app_state;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
