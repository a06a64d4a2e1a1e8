//! In-memory implementation of [`Store`].
//!
//! All tables live behind one `RwLock` so that each operation is atomic,
//! matching the single-statement guarantees of the Postgres backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Page, Store};
use crate::domain::{
    Match, NewRoom, Room, RoomId, RoomMember, Subscription, SubscriptionUpsert, Swipe, User,
    UserId,
};
use crate::error::{AppError, Area};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    rooms: HashMap<RoomId, Room>,
    members: HashMap<(RoomId, UserId), DateTime<Utc>>,
    swipes: HashMap<(RoomId, UserId, String), Swipe>,
    matches: HashMap<(RoomId, String), Match>,
    subscriptions: HashMap<UserId, Subscription>,
}

impl Tables {
    fn is_active(room: &Room, now: DateTime<Utc>) -> bool {
        !room.is_expired_at(now)
    }
}

/// Volatile store for tests and persistence-disabled deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn window<T>(mut items: Vec<T>, offset: u64, limit: u64) -> Page<T> {
    let total = items.len() as u64;
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(items.len());
    let take = usize::try_from(limit).unwrap_or(usize::MAX);
    let items = items.drain(start..).take(take).collect();
    Page { items, total }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<User, AppError> {
        let email = email.to_lowercase();
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.values_mut().find(|u| u.email == email) {
            if let Some(name) = name {
                user.name = Some(name.to_string());
            }
            return Ok(user.clone());
        }
        let user = User {
            id: UserId::new(),
            email,
            name: name.map(str::to_string),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_room(&self, room: NewRoom) -> Result<Room, AppError> {
        let mut tables = self.tables.write().await;
        if tables.rooms.values().any(|r| r.code == room.code) {
            return Err(AppError::conflict(
                Area::Rooms,
                format!("room code {} already taken", room.code),
            ));
        }
        let created = Room {
            id: RoomId::new(),
            code: room.code,
            name: room.name,
            created_by: room.created_by,
            match_threshold: room.match_threshold,
            filters: room.filters,
            created_at: room.created_at,
            expires_at: room.expires_at,
        };
        tables
            .members
            .insert((created.id, created.created_by), created.created_at);
        tables.rooms.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, AppError> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .rooms
            .values()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn list_rooms_for_member(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Room>, AppError> {
        let tables = self.tables.read().await;
        let mut rooms: Vec<Room> = tables
            .members
            .keys()
            .filter(|(_, member)| *member == user)
            .filter_map(|(room, _)| tables.rooms.get(room))
            .filter(|room| Tables::is_active(room, now))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(window(rooms, offset, limit))
    }

    async fn count_active_rooms_created_by(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .rooms
                .values()
                .filter(|r| r.created_by == user && Tables::is_active(r, now))
                .count(),
        ))
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.rooms.remove(&id).is_none() {
            return Ok(false);
        }
        tables.members.retain(|(room, _), _| *room != id);
        tables.swipes.retain(|(room, _, _), _| *room != id);
        tables.matches.retain(|(room, _), _| *room != id);
        Ok(true)
    }

    async fn add_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.rooms.contains_key(&room) {
            return Err(AppError::Persistence(format!("room {room} does not exist")));
        }
        if tables.members.contains_key(&(room, user)) {
            return Ok(false);
        }
        tables.members.insert((room, user), Utc::now());
        Ok(true)
    }

    async fn remove_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError> {
        Ok(self
            .tables
            .write()
            .await
            .members
            .remove(&(room, user))
            .is_some())
    }

    async fn is_member(&self, room: RoomId, user: UserId) -> Result<bool, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .contains_key(&(room, user)))
    }

    async fn count_members(&self, room: RoomId) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(count(tables.members.keys().filter(|(r, _)| *r == room).count()))
    }

    async fn list_members(&self, room: RoomId) -> Result<Vec<RoomMember>, AppError> {
        let tables = self.tables.read().await;
        let mut members: Vec<RoomMember> = tables
            .members
            .iter()
            .filter(|((r, _), _)| *r == room)
            .map(|((room_id, user_id), joined_at)| RoomMember {
                room_id: *room_id,
                user_id: *user_id,
                name: tables.users.get(user_id).and_then(|u| u.name.clone()),
                joined_at: *joined_at,
            })
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        Ok(members)
    }

    async fn find_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
    ) -> Result<Option<Swipe>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .swipes
            .get(&(room, user, movie_id.to_string()))
            .cloned())
    }

    async fn upsert_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
        value: bool,
    ) -> Result<Swipe, AppError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let swipe = tables
            .swipes
            .entry((room, user, movie_id.to_string()))
            .and_modify(|s| {
                s.value = value;
                s.updated_at = now;
            })
            .or_insert_with(|| Swipe {
                id: Uuid::new_v4(),
                room_id: room,
                user_id: user,
                movie_id: movie_id.to_string(),
                value,
                created_at: now,
                updated_at: now,
            });
        Ok(swipe.clone())
    }

    async fn delete_swipe(
        &self,
        room: RoomId,
        user: UserId,
        movie_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .tables
            .write()
            .await
            .swipes
            .remove(&(room, user, movie_id.to_string()))
            .is_some())
    }

    async fn count_positive_swipes(&self, room: RoomId, movie_id: &str) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .swipes
                .values()
                .filter(|s| s.room_id == room && s.movie_id == movie_id && s.value)
                .filter(|s| tables.members.contains_key(&(room, s.user_id)))
                .count(),
        ))
    }

    async fn count_user_swipes(&self, room: RoomId, user: UserId) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .swipes
                .keys()
                .filter(|(r, u, _)| *r == room && *u == user)
                .count(),
        ))
    }

    async fn list_user_swipes(&self, room: RoomId, user: UserId) -> Result<Vec<Swipe>, AppError> {
        let tables = self.tables.read().await;
        let mut swipes: Vec<Swipe> = tables
            .swipes
            .values()
            .filter(|s| s.room_id == room && s.user_id == user)
            .cloned()
            .collect();
        swipes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(swipes)
    }

    async fn insert_match_if_absent(
        &self,
        room: RoomId,
        movie_id: &str,
        vote_count: i64,
    ) -> Result<Option<Match>, AppError> {
        let mut tables = self.tables.write().await;
        let key = (room, movie_id.to_string());
        if tables.matches.contains_key(&key) {
            return Ok(None);
        }
        let created = Match {
            id: Uuid::new_v4(),
            room_id: room,
            movie_id: movie_id.to_string(),
            vote_count,
            created_at: Utc::now(),
        };
        tables.matches.insert(key, created.clone());
        Ok(Some(created))
    }

    async fn list_matches(
        &self,
        room: RoomId,
        offset: u64,
        limit: u64,
    ) -> Result<Page<Match>, AppError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<Match> = tables
            .matches
            .values()
            .filter(|m| m.room_id == room)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(window(matches, offset, limit))
    }

    async fn get_subscription(&self, user: UserId) -> Result<Option<Subscription>, AppError> {
        Ok(self.tables.read().await.subscriptions.get(&user).cloned())
    }

    async fn upsert_subscription(
        &self,
        input: SubscriptionUpsert,
    ) -> Result<Subscription, AppError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let subscription = match tables.subscriptions.get(&input.user_id) {
            Some(existing) => Subscription {
                id: existing.id,
                user_id: input.user_id,
                plan: input.plan,
                status: input.status,
                stripe_customer_id: input
                    .stripe_customer_id
                    .or_else(|| existing.stripe_customer_id.clone()),
                stripe_subscription_id: input
                    .stripe_subscription_id
                    .or_else(|| existing.stripe_subscription_id.clone()),
                current_period_start: input.current_period_start,
                current_period_end: input.current_period_end,
                cancel_at_period_end: input.cancel_at_period_end,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => Subscription {
                id: Uuid::new_v4(),
                user_id: input.user_id,
                plan: input.plan,
                status: input.status,
                stripe_customer_id: input.stripe_customer_id,
                stripe_subscription_id: input.stripe_subscription_id,
                current_period_start: input.current_period_start,
                current_period_end: input.current_period_end,
                cancel_at_period_end: input.cancel_at_period_end,
                created_at: now,
                updated_at: now,
            },
        };
        tables
            .subscriptions
            .insert(subscription.user_id, subscription.clone());
        Ok(subscription)
    }

    async fn set_cancel_at_period_end(
        &self,
        user: UserId,
        cancel: bool,
    ) -> Result<Option<Subscription>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.subscriptions.get_mut(&user).map(|sub| {
            sub.cancel_at_period_end = cancel;
            sub.updated_at = Utc::now();
            sub.clone()
        }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Plan, RoomFilters, SubscriptionStatus};
    use chrono::Duration;

    fn new_room(code: &str, owner: UserId, expires_at: Option<DateTime<Utc>>) -> NewRoom {
        NewRoom {
            code: code.to_string(),
            name: "Movie night".to_string(),
            created_by: owner,
            match_threshold: None,
            filters: RoomFilters::default(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    async fn user(store: &MemoryStore, email: &str) -> User {
        let Ok(user) = store.upsert_user(email, Some("Test")).await else {
            panic!("upsert should succeed");
        };
        user
    }

    #[tokio::test]
    async fn upsert_user_is_case_insensitive_and_keeps_name() {
        let store = MemoryStore::new();
        let first = user(&store, "Ana@Example.com").await;
        let Ok(second) = store.upsert_user("ana@example.com", None).await else {
            panic!("upsert should succeed");
        };
        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "ana@example.com");
        assert_eq!(second.name.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn create_room_adds_creator_and_rejects_duplicate_code() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let Ok(room) = store.create_room(new_room("ABC234", owner.id, None)).await else {
            panic!("room should be created");
        };
        assert_eq!(store.count_members(room.id).await.ok(), Some(1));
        assert!(store.is_member(room.id, owner.id).await.unwrap_or(false));

        let dup = store.create_room(new_room("ABC234", owner.id, None)).await;
        assert!(matches!(dup, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn add_member_is_idempotent() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let guest = user(&store, "guest@example.com").await;
        let Ok(room) = store.create_room(new_room("ABC234", owner.id, None)).await else {
            panic!("room should be created");
        };
        assert_eq!(store.add_member(room.id, guest.id).await.ok(), Some(true));
        assert_eq!(store.add_member(room.id, guest.id).await.ok(), Some(false));
        assert_eq!(store.count_members(room.id).await.ok(), Some(2));
    }

    #[tokio::test]
    async fn expired_rooms_are_hidden_from_listing() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let past = Utc::now() - Duration::hours(1);
        let _ = store.create_room(new_room("ABC234", owner.id, Some(past))).await;
        let _ = store.create_room(new_room("XYZ789", owner.id, None)).await;

        let Ok(page) = store
            .list_rooms_for_member(owner.id, Utc::now(), 0, 10)
            .await
        else {
            panic!("listing should succeed");
        };
        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            store
                .count_active_rooms_created_by(owner.id, Utc::now())
                .await
                .ok(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn swipe_overwrite_keeps_single_row() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let Ok(room) = store.create_room(new_room("ABC234", owner.id, None)).await else {
            panic!("room should be created");
        };
        let Ok(first) = store.upsert_swipe(room.id, owner.id, "550", true).await else {
            panic!("swipe should succeed");
        };
        let Ok(second) = store.upsert_swipe(room.id, owner.id, "550", false).await else {
            panic!("swipe should succeed");
        };
        assert_eq!(first.id, second.id);
        assert!(!second.value);
        assert_eq!(store.count_user_swipes(room.id, owner.id).await.ok(), Some(1));
        assert_eq!(store.count_positive_swipes(room.id, "550").await.ok(), Some(0));
    }

    #[tokio::test]
    async fn positive_count_ignores_departed_members() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let guest = user(&store, "guest@example.com").await;
        let Ok(room) = store.create_room(new_room("ABC235", owner.id, None)).await else {
            panic!("room should be created");
        };
        assert!(matches!(store.add_member(room.id, guest.id).await, Ok(true)));
        assert!(store.upsert_swipe(room.id, owner.id, "550", true).await.is_ok());
        assert!(store.upsert_swipe(room.id, guest.id, "550", true).await.is_ok());
        assert_eq!(store.count_positive_swipes(room.id, "550").await.ok(), Some(2));

        assert!(matches!(store.remove_member(room.id, guest.id).await, Ok(true)));
        assert_eq!(store.count_positive_swipes(room.id, "550").await.ok(), Some(1));
    }

    #[tokio::test]
    async fn match_is_inserted_once() {
        let store = MemoryStore::new();
        let room = RoomId::new();
        let first = store.insert_match_if_absent(room, "550", 2).await;
        let second = store.insert_match_if_absent(room, "550", 3).await;
        assert!(matches!(first, Ok(Some(_))));
        assert!(matches!(second, Ok(None)));
        let Ok(page) = store.list_matches(room, 0, 10).await else {
            panic!("listing should succeed");
        };
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn list_matches_windows_results() {
        let store = MemoryStore::new();
        let room = RoomId::new();
        for movie in ["1", "2", "3"] {
            let _ = store.insert_match_if_absent(room, movie, 2).await;
        }
        let Ok(page) = store.list_matches(room, 2, 2).await else {
            panic!("listing should succeed");
        };
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        let Ok(page) = store.list_matches(room, 10, 2).await else {
            panic!("listing should succeed");
        };
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn delete_room_cascades() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let Ok(room) = store.create_room(new_room("ABC234", owner.id, None)).await else {
            panic!("room should be created");
        };
        let _ = store.upsert_swipe(room.id, owner.id, "550", true).await;
        let _ = store.insert_match_if_absent(room.id, "550", 1).await;

        assert_eq!(store.delete_room(room.id).await.ok(), Some(true));
        assert_eq!(store.count_members(room.id).await.ok(), Some(0));
        assert_eq!(store.count_user_swipes(room.id, owner.id).await.ok(), Some(0));
        assert_eq!(
            store.list_matches(room.id, 0, 10).await.map(|p| p.total).ok(),
            Some(0)
        );
        assert_eq!(store.delete_room(room.id).await.ok(), Some(false));
    }

    #[tokio::test]
    async fn subscription_upsert_keeps_stripe_ids() {
        let store = MemoryStore::new();
        let owner = user(&store, "owner@example.com").await;
        let base = SubscriptionUpsert {
            user_id: owner.id,
            plan: Plan::Starter,
            status: SubscriptionStatus::Active,
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_subscription_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
        };
        let Ok(created) = store.upsert_subscription(base.clone()).await else {
            panic!("upsert should succeed");
        };
        let Ok(updated) = store
            .upsert_subscription(SubscriptionUpsert {
                plan: Plan::Pro,
                stripe_customer_id: None,
                ..base
            })
            .await
        else {
            panic!("upsert should succeed");
        };
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.plan, Plan::Pro);
        assert_eq!(updated.stripe_customer_id.as_deref(), Some("cus_1"));

        let Ok(Some(cancelled)) = store.set_cancel_at_period_end(owner.id, true).await else {
            panic!("cancel should find the subscription");
        };
        assert!(cancelled.cancel_at_period_end);
        assert!(matches!(
            store.set_cancel_at_period_end(UserId::new(), true).await,
            Ok(None)
        ));
    }
}
