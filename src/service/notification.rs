//! Match notification e-mails.

use std::sync::Arc;

use super::SubscriptionService;
use crate::clients::{Email, ResendClient};
use crate::domain::plan::{self, Feature};
use crate::domain::{Match, Room};
use crate::error::AppError;
use crate::persistence::Store;

/// Sends best-effort e-mails to room members when a match is created.
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
    subscriptions: SubscriptionService,
    email: Option<ResendClient>,
    from: String,
    app_url: String,
}

impl NotificationService {
    /// Creates a new `NotificationService`. Without an e-mail client every
    /// notification is skipped.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        subscriptions: SubscriptionService,
        email: Option<ResendClient>,
        from: &str,
        app_url: &str,
    ) -> Self {
        Self {
            store,
            subscriptions,
            email,
            from: from.to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Notifies the members of `room` about `created` in the background.
    /// Failures are logged and never reach the caller.
    pub fn match_created(&self, room: &Room, created: &Match) {
        if self.email.is_none() {
            return;
        }
        let this = self.clone();
        let room = room.clone();
        let created = created.clone();
        tokio::spawn(async move {
            if let Err(e) = this.send_match_email(&room, &created).await {
                tracing::warn!(room_id = %room.id, error = %e, "match notification failed");
            }
        });
    }

    /// Sends the e-mail for `created` if the owner's plan includes
    /// notifications. Returns whether an e-mail was sent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`] if the e-mail API fails.
    pub async fn send_match_email(&self, room: &Room, created: &Match) -> Result<bool, AppError> {
        let Some(client) = &self.email else {
            return Ok(false);
        };
        let owner_plan = self.subscriptions.effective_plan(room.created_by).await?;
        if !plan::has_feature(owner_plan, Feature::EmailNotifications) {
            return Ok(false);
        }

        let mut recipients = Vec::new();
        for member in self.store.list_members(room.id).await? {
            if let Some(user) = self.store.get_user(member.user_id).await? {
                recipients.push(user.email);
            }
        }
        if recipients.is_empty() {
            return Ok(false);
        }

        let email = Email {
            from: self.from.clone(),
            to: recipients,
            subject: format!("It's a match in {}!", room.name),
            html: format!(
                "<p>Your room <strong>{}</strong> agreed on a title.</p>\
                 <p><a href=\"{}/rooms/{}/matches\">See your matches</a></p>",
                escape_html(&room.name),
                self.app_url,
                room.id
            ),
        };
        client.send(&email).await?;
        tracing::info!(room_id = %room.id, movie_id = %created.movie_id, "match notification sent");
        Ok(true)
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{NewRoom, Plan, RoomFilters, SubscriptionStatus, SubscriptionUpsert};
    use crate::persistence::MemoryStore;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(server: &MockServer, plan: Plan) -> (NotificationService, Room, Match) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let subscriptions = SubscriptionService::new(Arc::clone(&store), None);
        let Ok(owner) = store.upsert_user("owner@example.com", None).await else {
            panic!("user should be created");
        };
        let _ = subscriptions
            .upsert(SubscriptionUpsert {
                user_id: owner.id,
                plan,
                status: SubscriptionStatus::Active,
                stripe_customer_id: None,
                stripe_subscription_id: None,
                current_period_start: None,
                current_period_end: None,
                cancel_at_period_end: false,
            })
            .await;
        let Ok(room) = store
            .create_room(NewRoom {
                code: "ABC234".to_string(),
                name: "Friday <night>".to_string(),
                created_by: owner.id,
                match_threshold: None,
                filters: RoomFilters::default(),
                created_at: Utc::now(),
                expires_at: None,
            })
            .await
        else {
            panic!("room should be created");
        };
        let created = Match {
            id: Uuid::new_v4(),
            room_id: room.id,
            movie_id: "550".to_string(),
            vote_count: 1,
            created_at: Utc::now(),
        };
        let email = ResendClient::new(reqwest::Client::new(), &server.uri(), "re_test");
        let service = NotificationService::new(
            store,
            subscriptions,
            Some(email),
            "Swipe Movie <noreply@swipe.movie>",
            "http://localhost:3001/",
        );
        (service, room, created)
    }

    #[tokio::test]
    async fn paid_plan_sends_to_members() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(body_partial_json(json!({"to": ["owner@example.com"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let (service, room, created) = setup(&server, Plan::Starter).await;
        assert_eq!(service.send_match_email(&room, &created).await.ok(), Some(true));
    }

    #[tokio::test]
    async fn free_plan_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (service, room, created) = setup(&server, Plan::Free).await;
        assert_eq!(service.send_match_email(&room, &created).await.ok(), Some(false));
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<b>&\""), "&lt;b&gt;&amp;&quot;");
    }
}
