//! Room lifecycle: creation, joining, membership and deletion.

use std::sync::Arc;

use chrono::Utc;

use super::SubscriptionService;
use crate::domain::plan::{self, Feature, Limit};
use crate::domain::{Room, RoomFilters, RoomId, RoomMember, UserId, room_code};
use crate::domain::{NewRoom, Plan};
use crate::error::{AppError, Area};
use crate::persistence::{Page, Store};

/// Attempts at finding a free room code before giving up.
const CODE_ATTEMPTS: usize = 5;

const MAX_NAME_LEN: usize = 100;

/// Input for [`RoomService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateRoom {
    /// Display name.
    pub name: String,
    /// Optional agreement threshold.
    pub match_threshold: Option<i32>,
    /// Candidate filters.
    pub filters: RoomFilters,
}

/// Room orchestration on top of the [`Store`].
#[derive(Debug, Clone)]
pub struct RoomService {
    store: Arc<dyn Store>,
    subscriptions: SubscriptionService,
    code_length: usize,
}

impl RoomService {
    /// Creates a new `RoomService` generating codes of `code_length`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        subscriptions: SubscriptionService,
        code_length: usize,
    ) -> Self {
        Self {
            store,
            subscriptions,
            code_length: code_length.clamp(room_code::MIN_LENGTH, room_code::MAX_LENGTH),
        }
    }

    /// Creates a room owned by `user`, who becomes its first member.
    ///
    /// The creator's effective plan decides whether another room is
    /// allowed, whether advanced filters may be used and when the room
    /// expires.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a bad name, threshold or filter.
    /// - [`AppError::LimitExceeded`] if the plan forbids the room.
    /// - [`AppError::Conflict`] if no free code was found.
    pub async fn create(&self, user: UserId, input: CreateRoom) -> Result<Room, AppError> {
        let name = input.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::invalid(
                Area::Rooms,
                format!("name must be between 1 and {MAX_NAME_LEN} characters"),
            ));
        }
        if input.match_threshold.is_some_and(|t| t < 1) {
            return Err(AppError::invalid(
                Area::Rooms,
                "matchThreshold must be at least 1",
            ));
        }
        input.filters.validate()?;

        let plan = self.subscriptions.effective_plan(user).await?;
        if input.filters.uses_advanced() && !plan::has_feature(plan, Feature::AdvancedFilters) {
            return Err(AppError::LimitExceeded {
                area: Area::Rooms,
                message: format!(
                    "Advanced filters require the {} plan or higher.",
                    Plan::Starter
                ),
            });
        }

        let now = Utc::now();
        let active = self.store.count_active_rooms_created_by(user, now).await?;
        plan::ensure_within(plan, Limit::Rooms, active, Area::Rooms)?;

        let expires_at = plan::room_expiry(plan, now);
        for attempt in 1..=CODE_ATTEMPTS {
            let candidate = NewRoom {
                code: room_code::generate(self.code_length),
                name: name.to_string(),
                created_by: user,
                match_threshold: input.match_threshold,
                filters: input.filters.clone(),
                created_at: now,
                expires_at,
            };
            match self.store.create_room(candidate).await {
                Ok(room) => {
                    tracing::info!(room_id = %room.id, code = %room.code, %plan, "room created");
                    return Ok(room);
                }
                Err(AppError::Conflict { .. }) => {
                    tracing::debug!(attempt, "room code collision");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::conflict(
            Area::Rooms,
            format!("no free room code after {CODE_ATTEMPTS} attempts"),
        ))
    }

    /// Joins the room with `code`. Joining a room one already belongs to
    /// returns it unchanged.
    ///
    /// The participant limit is a count followed by an insert, not one
    /// atomic step: concurrent joins may overshoot it by the number of
    /// racing requests.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a malformed code.
    /// - [`AppError::NotFound`] / [`AppError::Gone`] for unknown or
    ///   expired rooms.
    /// - [`AppError::LimitExceeded`] when the owner's plan is full.
    pub async fn join(&self, user: UserId, code: &str) -> Result<Room, AppError> {
        let room = self.find_active_by_code(code).await?;
        if self.store.is_member(room.id, user).await? {
            return Ok(room);
        }

        let owner_plan = self.subscriptions.effective_plan(room.created_by).await?;
        let members = self.store.count_members(room.id).await?;
        plan::ensure_within(owner_plan, Limit::Participants, members, Area::Rooms)?;

        if self.store.add_member(room.id, user).await? {
            tracing::info!(room_id = %room.id, user_id = %user, "member joined");
        }
        Ok(room)
    }

    /// Rooms `user` belongs to that have not expired, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] on store failure.
    pub async fn my_rooms(
        &self,
        user: UserId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Room>, AppError> {
        self.store
            .list_rooms_for_member(user, Utc::now(), offset, limit)
            .await
    }

    /// Looks a room up by code and counts its members.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`], [`AppError::NotFound`] or
    /// [`AppError::Gone`] as for [`RoomService::join`].
    pub async fn get_by_code(&self, code: &str) -> Result<(Room, i64), AppError> {
        let room = self.find_active_by_code(code).await?;
        let members = self.store.count_members(room.id).await?;
        Ok((room, members))
    }

    /// Lists members of a room the caller belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn members(&self, user: UserId, room_id: RoomId) -> Result<Vec<RoomMember>, AppError> {
        let room = self.room_for_member(room_id, user, Area::Rooms).await?;
        self.store.list_members(room.id).await
    }

    /// Removes the caller from a room.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown rooms and
    /// [`AppError::Forbidden`] for non-members.
    pub async fn leave(&self, user: UserId, room_id: RoomId) -> Result<(), AppError> {
        let room = self.get(room_id, Area::Rooms).await?;
        if !self.store.remove_member(room.id, user).await? {
            return Err(AppError::forbidden(
                Area::Rooms,
                format!("user {user} is not a member of room {room_id}"),
            ));
        }
        tracing::info!(%room_id, user_id = %user, "member left");
        Ok(())
    }

    /// Deletes a room with everything in it. Only the creator may do so.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown rooms and
    /// [`AppError::Forbidden`] for anyone but the creator.
    pub async fn delete(&self, user: UserId, room_id: RoomId) -> Result<(), AppError> {
        let room = self.get(room_id, Area::Rooms).await?;
        if room.created_by != user {
            return Err(AppError::forbidden(
                Area::Rooms,
                format!("user {user} did not create room {room_id}"),
            ));
        }
        self.store.delete_room(room_id).await?;
        tracing::info!(%room_id, "room deleted");
        Ok(())
    }

    /// Loads a room, reporting a missing one in `area`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the room does not exist.
    pub async fn get(&self, room_id: RoomId, area: Area) -> Result<Room, AppError> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or_else(|| AppError::not_found(area, format!("room {room_id}")))
    }

    /// Loads a room the caller belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] or [`AppError::Forbidden`].
    pub async fn room_for_member(
        &self,
        room_id: RoomId,
        user: UserId,
        area: Area,
    ) -> Result<Room, AppError> {
        let room = self.get(room_id, area).await?;
        if !self.store.is_member(room_id, user).await? {
            return Err(AppError::forbidden(
                area,
                format!("user {user} is not a member of room {room_id}"),
            ));
        }
        Ok(room)
    }

    /// Like [`RoomService::room_for_member`] but also rejects expired rooms.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`], [`AppError::Gone`] or
    /// [`AppError::Forbidden`].
    pub async fn active_room_for_member(
        &self,
        room_id: RoomId,
        user: UserId,
        area: Area,
    ) -> Result<Room, AppError> {
        let room = self.get(room_id, area).await?;
        room.ensure_active(area)?;
        if !self.store.is_member(room_id, user).await? {
            return Err(AppError::forbidden(
                area,
                format!("user {user} is not a member of room {room_id}"),
            ));
        }
        Ok(room)
    }

    async fn find_active_by_code(&self, code: &str) -> Result<Room, AppError> {
        let code = room_code::normalize(code, self.code_length)?;
        let room = self
            .store
            .find_room_by_code(&code)
            .await?
            .ok_or_else(|| AppError::not_found(Area::Rooms, format!("room code {code}")))?;
        room.ensure_active(Area::Rooms)?;
        Ok(room)
    }
}
