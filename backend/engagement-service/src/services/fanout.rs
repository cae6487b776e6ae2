//! Notification fan-out for social actions.
//!
//! Delivery is best effort: failures and timeouts are logged and counted,
//! never returned to the caller of the triggering mutation.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::error::Elapsed;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::{ContentRef, NewNotification, Notification, NotificationKind};
use crate::error::ServiceResult;
use crate::metrics;
use crate::repository::{NotificationStore, ProfileDirectory};

const FALLBACK_ACTOR_NAME: &str = "Someone";

/// Fan-out tuning
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Upper bound on a single notification write
    pub timeout: Duration,
    /// Characters of a comment body quoted in the notification
    pub excerpt_chars: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            excerpt_chars: 50,
        }
    }
}

/// A qualifying social action
#[derive(Debug, Clone)]
pub enum FanoutEvent {
    Follow {
        actor_id: Uuid,
        followee_id: Uuid,
    },
    Like {
        actor_id: Uuid,
        owner_id: Uuid,
        target: ContentRef,
    },
    Save {
        actor_id: Uuid,
        owner_id: Uuid,
        target: ContentRef,
    },
    Comment {
        actor_id: Uuid,
        owner_id: Uuid,
        target: ContentRef,
        body: String,
    },
}

impl FanoutEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            FanoutEvent::Follow { .. } => NotificationKind::Follow,
            FanoutEvent::Like { .. } => NotificationKind::Like,
            FanoutEvent::Save { .. } => NotificationKind::Save,
            FanoutEvent::Comment { .. } => NotificationKind::Comment,
        }
    }

    pub fn actor_id(&self) -> Uuid {
        match self {
            FanoutEvent::Follow { actor_id, .. }
            | FanoutEvent::Like { actor_id, .. }
            | FanoutEvent::Save { actor_id, .. }
            | FanoutEvent::Comment { actor_id, .. } => *actor_id,
        }
    }

    pub fn recipient_id(&self) -> Uuid {
        match self {
            FanoutEvent::Follow { followee_id, .. } => *followee_id,
            FanoutEvent::Like { owner_id, .. }
            | FanoutEvent::Save { owner_id, .. }
            | FanoutEvent::Comment { owner_id, .. } => *owner_id,
        }
    }

    pub fn target(&self) -> Option<ContentRef> {
        match self {
            FanoutEvent::Follow { .. } => None,
            FanoutEvent::Like { target, .. }
            | FanoutEvent::Save { target, .. }
            | FanoutEvent::Comment { target, .. } => Some(*target),
        }
    }

    /// Title and message shown to the recipient
    pub fn compose(&self, actor_name: &str, excerpt_chars: usize) -> (String, String) {
        match self {
            FanoutEvent::Follow { .. } => (
                "New follower".to_string(),
                format!("{} started following you", actor_name),
            ),
            FanoutEvent::Like { target, .. } => (
                "New like".to_string(),
                format!("{} liked your {}", actor_name, target.kind),
            ),
            FanoutEvent::Save { target, .. } => (
                "Outfit saved".to_string(),
                format!("{} saved your {}", actor_name, target.kind),
            ),
            FanoutEvent::Comment { body, .. } => (
                "New comment".to_string(),
                format!(
                    "{} commented: \"{}\"",
                    actor_name,
                    excerpt(body, excerpt_chars)
                ),
            ),
        }
    }
}

/// First `max_chars` characters of `body`, with `...` appended when cut.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Clone)]
pub struct NotificationFanout {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn ProfileDirectory>,
    config: FanoutConfig,
}

impl NotificationFanout {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn ProfileDirectory>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Produce the notification for `event`, suppressing self-actions.
    ///
    /// The actor lookup and the write share one time budget.
    pub async fn dispatch(&self, event: FanoutEvent) -> Option<Notification> {
        let kind = event.kind();
        if event.recipient_id() == event.actor_id() {
            debug!(kind = kind.as_str(), actor_id = %event.actor_id(), "Self action, notification suppressed");
            metrics::record_fanout(kind.as_str(), "suppressed");
            return None;
        }

        let recipient_id = event.recipient_id();
        let outcome = tokio::time::timeout(self.config.timeout, self.deliver(event)).await;
        self.settle(kind, recipient_id, outcome)
    }

    /// Persist a notification; never fails from the caller's perspective.
    pub async fn notify(&self, new: NewNotification) -> Option<Notification> {
        let kind = new.kind;
        let recipient_id = new.recipient_id;
        let outcome = tokio::time::timeout(self.config.timeout, self.store.create(new)).await;
        self.settle(kind, recipient_id, outcome)
    }

    async fn deliver(&self, event: FanoutEvent) -> ServiceResult<Notification> {
        let actor_name = self.actor_name(event.actor_id()).await;
        let (title, message) = event.compose(&actor_name, self.config.excerpt_chars);

        self.store
            .create(NewNotification {
                recipient_id: event.recipient_id(),
                actor_id: Some(event.actor_id()),
                kind: event.kind(),
                title,
                message: Some(message),
                target: event.target(),
            })
            .await
    }

    fn settle(
        &self,
        kind: NotificationKind,
        recipient_id: Uuid,
        outcome: Result<ServiceResult<Notification>, Elapsed>,
    ) -> Option<Notification> {
        let kind = kind.as_str();
        match outcome {
            Ok(Ok(notification)) => {
                info!(
                    notification_id = %notification.id,
                    recipient_id = %recipient_id,
                    kind,
                    "Created notification"
                );
                metrics::record_fanout(kind, "delivered");
                Some(notification)
            }
            Ok(Err(err)) => {
                warn!(error = %err, recipient_id = %recipient_id, kind, "Failed to create notification");
                metrics::record_fanout(kind, "failed");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    recipient_id = %recipient_id,
                    kind,
                    "Notification fan-out timed out"
                );
                metrics::record_fanout(kind, "timeout");
                None
            }
        }
    }

    async fn actor_name(&self, actor_id: Uuid) -> String {
        match self.directory.get_profile(actor_id).await {
            Ok(Some(profile)) => profile.display_name().to_string(),
            Ok(None) => FALLBACK_ACTOR_NAME.to_string(),
            Err(err) => {
                warn!(error = %err, actor_id = %actor_id, "Actor lookup failed for notification");
                FALLBACK_ACTOR_NAME.to_string()
            }
        }
    }
}
