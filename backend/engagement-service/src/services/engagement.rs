use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::fanout::{FanoutConfig, FanoutEvent, NotificationFanout};
use crate::domain::models::{
    Comment, CommentThread, CommentView, ContentCounts, ContentRef, EngagementKind, FollowCounts,
    FollowEdge, FollowListEntry, FollowOutcome, NewComment, Notification, Profile, ProfileSummary,
    ToggleOutcome,
};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::repository::{
    CommentStore, EngagementStore, MemoryBackend, NotificationStore, PgCommentStore,
    PgEngagementStore, PgNotificationStore, PgProfileDirectory, PgRelationshipStore,
    ProfileDirectory, RelationshipStore,
};

/// Persistence collaborators of the engagement service
#[derive(Clone)]
pub struct Stores {
    pub relationships: Arc<dyn RelationshipStore>,
    pub engagements: Arc<dyn EngagementStore>,
    pub comments: Arc<dyn CommentStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub directory: Arc<dyn ProfileDirectory>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            relationships: Arc::new(PgRelationshipStore::new(pool.clone())),
            engagements: Arc::new(PgEngagementStore::new(pool.clone())),
            comments: Arc::new(PgCommentStore::new(pool.clone())),
            notifications: Arc::new(PgNotificationStore::new(pool.clone())),
            directory: Arc::new(PgProfileDirectory::new(pool)),
        }
    }

    pub fn memory(backend: &MemoryBackend) -> Self {
        Self {
            relationships: Arc::new(backend.clone()),
            engagements: Arc::new(backend.clone()),
            comments: Arc::new(backend.clone()),
            notifications: Arc::new(backend.clone()),
            directory: Arc::new(backend.clone()),
        }
    }
}

fn require_actor(actor: Option<Uuid>) -> ServiceResult<Uuid> {
    actor.ok_or_else(ServiceError::unauthenticated)
}

fn observe<T>(operation: &str, result: &ServiceResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    metrics::record_operation(operation, outcome);
}

/// Group a flat, oldest-first comment list into top-level threads.
///
/// Replies whose parent is not in the list are dropped.
pub fn build_threads(comments: Vec<Comment>, profiles: &HashMap<Uuid, Profile>) -> Vec<CommentThread> {
    let view = |comment: Comment| CommentView {
        author: profiles.get(&comment.author_id).map(ProfileSummary::from),
        comment,
    };

    let (roots, replies): (Vec<Comment>, Vec<Comment>) = comments
        .into_iter()
        .partition(|c| c.parent_comment_id.is_none());

    let mut replies_by_parent: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_comment_id {
            replies_by_parent
                .entry(parent_id)
                .or_default()
                .push(view(reply));
        }
    }

    roots
        .into_iter()
        .map(|root| {
            let replies = replies_by_parent.remove(&root.id).unwrap_or_default();
            CommentThread {
                root: view(root),
                replies,
            }
        })
        .collect()
}

/// Public entry point for follow, like/save, comment and notification operations.
///
/// Every mutating operation takes the authenticated actor; `None` fails with
/// `Unauthorized`. Reads with no actor return the "not engaged" default.
#[derive(Clone)]
pub struct EngagementService {
    relationships: Arc<dyn RelationshipStore>,
    engagements: Arc<dyn EngagementStore>,
    comments: Arc<dyn CommentStore>,
    notifications: Arc<dyn NotificationStore>,
    directory: Arc<dyn ProfileDirectory>,
    fanout: NotificationFanout,
    enrichment_timeout: Duration,
}

impl EngagementService {
    pub fn new(stores: Stores, fanout_config: FanoutConfig) -> Self {
        let enrichment_timeout = fanout_config.timeout;
        let fanout = NotificationFanout::new(
            stores.notifications.clone(),
            stores.directory.clone(),
            fanout_config,
        );
        Self {
            relationships: stores.relationships,
            engagements: stores.engagements,
            comments: stores.comments,
            notifications: stores.notifications,
            directory: stores.directory,
            fanout,
            enrichment_timeout,
        }
    }

    // ========== Relationships ==========

    pub async fn follow(&self, actor: Option<Uuid>, followee_id: Uuid) -> ServiceResult<FollowOutcome> {
        let result = self.follow_inner(actor, followee_id).await;
        observe("follow", &result);
        result
    }

    async fn follow_inner(&self, actor: Option<Uuid>, followee_id: Uuid) -> ServiceResult<FollowOutcome> {
        let follower_id = require_actor(actor)?;
        if follower_id == followee_id {
            return Err(ServiceError::InvalidOperation(
                "users cannot follow themselves".to_string(),
            ));
        }

        let inserted = self.relationships.follow(follower_id, followee_id).await?;
        info!(
            follower_id = %inserted.edge.follower_id,
            followee_id = %inserted.edge.followee_id,
            followers_count = inserted.followee.followers_count,
            "User followed"
        );

        self.fanout
            .dispatch(FanoutEvent::Follow {
                actor_id: follower_id,
                followee_id,
            })
            .await;

        Ok(FollowOutcome {
            following: true,
            followee: inserted.followee,
        })
    }

    pub async fn unfollow(&self, actor: Option<Uuid>, followee_id: Uuid) -> ServiceResult<FollowOutcome> {
        let result = self.unfollow_inner(actor, followee_id).await;
        observe("unfollow", &result);
        result
    }

    async fn unfollow_inner(&self, actor: Option<Uuid>, followee_id: Uuid) -> ServiceResult<FollowOutcome> {
        let follower_id = require_actor(actor)?;
        let followee = self.relationships.unfollow(follower_id, followee_id).await?;
        info!(follower_id = %follower_id, followee_id = %followee_id, "User unfollowed");

        Ok(FollowOutcome {
            following: false,
            followee,
        })
    }

    pub async fn is_following(&self, actor: Option<Uuid>, followee_id: Uuid) -> ServiceResult<bool> {
        match actor {
            Some(follower_id) if follower_id != followee_id => {
                self.relationships.is_following(follower_id, followee_id).await
            }
            _ => Ok(false),
        }
    }

    pub async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowListEntry>> {
        let edges = self.relationships.list_followers(user_id, limit, offset).await?;
        self.enrich_edges(edges, |edge| edge.follower_id).await
    }

    pub async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowListEntry>> {
        let edges = self.relationships.list_following(user_id, limit, offset).await?;
        self.enrich_edges(edges, |edge| edge.followee_id).await
    }

    pub async fn follow_counts(&self, user_id: Uuid) -> ServiceResult<FollowCounts> {
        self.relationships.follow_counts(user_id).await
    }

    async fn enrich_edges(
        &self,
        edges: Vec<FollowEdge>,
        other: impl Fn(&FollowEdge) -> Uuid,
    ) -> ServiceResult<Vec<FollowListEntry>> {
        let ids: Vec<Uuid> = edges.iter().map(&other).collect();
        let profiles = self.directory.get_profiles(&ids).await?;

        Ok(edges
            .iter()
            .map(|edge| {
                let user_id = other(edge);
                FollowListEntry {
                    user_id,
                    profile: profiles.get(&user_id).map(ProfileSummary::from),
                    followed_at: edge.created_at,
                }
            })
            .collect())
    }

    // ========== Likes & saves ==========

    pub async fn toggle_like(&self, actor: Option<Uuid>, target: ContentRef) -> ServiceResult<ToggleOutcome> {
        let result = self.toggle(actor, target, EngagementKind::Like).await;
        observe("toggle_like", &result);
        result
    }

    pub async fn toggle_save(&self, actor: Option<Uuid>, outfit_id: Uuid) -> ServiceResult<ToggleOutcome> {
        let result = self
            .toggle(actor, ContentRef::outfit(outfit_id), EngagementKind::Save)
            .await;
        observe("toggle_save", &result);
        result
    }

    async fn toggle(
        &self,
        actor: Option<Uuid>,
        target: ContentRef,
        kind: EngagementKind,
    ) -> ServiceResult<ToggleOutcome> {
        let actor_id = require_actor(actor)?;
        let toggled = self.engagements.toggle(target, kind, actor_id).await?;

        if toggled.active {
            let event = match kind {
                EngagementKind::Like => FanoutEvent::Like {
                    actor_id,
                    owner_id: toggled.owner_id,
                    target,
                },
                EngagementKind::Save => FanoutEvent::Save {
                    actor_id,
                    owner_id: toggled.owner_id,
                    target,
                },
            };
            self.fanout.dispatch(event).await;
        }

        Ok(toggled.into())
    }

    pub async fn is_liked(&self, actor: Option<Uuid>, target: ContentRef) -> ServiceResult<bool> {
        match actor {
            Some(actor_id) => {
                self.engagements
                    .is_engaged(target, EngagementKind::Like, actor_id)
                    .await
            }
            None => Ok(false),
        }
    }

    pub async fn is_saved(&self, actor: Option<Uuid>, outfit_id: Uuid) -> ServiceResult<bool> {
        match actor {
            Some(actor_id) => {
                self.engagements
                    .is_engaged(ContentRef::outfit(outfit_id), EngagementKind::Save, actor_id)
                    .await
            }
            None => Ok(false),
        }
    }

    pub async fn content_counts(&self, target: ContentRef) -> ServiceResult<ContentCounts> {
        self.engagements.counts(target).await
    }

    // ========== Comments ==========

    pub async fn add_comment(
        &self,
        actor: Option<Uuid>,
        target: ContentRef,
        body: &str,
        parent_comment_id: Option<Uuid>,
    ) -> ServiceResult<CommentView> {
        let result = self
            .add_comment_inner(actor, target, body, parent_comment_id)
            .await;
        observe("add_comment", &result);
        result
    }

    async fn add_comment_inner(
        &self,
        actor: Option<Uuid>,
        target: ContentRef,
        body: &str,
        parent_comment_id: Option<Uuid>,
    ) -> ServiceResult<CommentView> {
        let author_id = require_actor(actor)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "comment body cannot be empty".to_string(),
            ));
        }

        let inserted = self
            .comments
            .add_comment(NewComment {
                target,
                author_id,
                body: body.to_string(),
                parent_comment_id,
            })
            .await?;
        info!(
            comment_id = %inserted.comment.id,
            content_id = %target.id,
            content_kind = %target.kind,
            author_id = %author_id,
            reply = parent_comment_id.is_some(),
            "Comment added"
        );

        if parent_comment_id.is_none() {
            self.fanout
                .dispatch(FanoutEvent::Comment {
                    actor_id: author_id,
                    owner_id: inserted.content_owner_id,
                    target,
                    body: inserted.comment.body.clone(),
                })
                .await;
        }

        let author = self.author_summary(author_id).await;

        Ok(CommentView {
            comment: inserted.comment,
            author,
        })
    }

    /// Author identity for a freshly committed comment; `None` when the
    /// directory errors or does not answer within the fan-out budget.
    async fn author_summary(&self, author_id: Uuid) -> Option<ProfileSummary> {
        match tokio::time::timeout(self.enrichment_timeout, self.directory.get_profile(author_id)).await {
            Ok(Ok(profile)) => profile.as_ref().map(ProfileSummary::from),
            Ok(Err(err)) => {
                warn!(error = %err, author_id = %author_id, "Author lookup failed after comment insert");
                None
            }
            Err(_) => {
                warn!(author_id = %author_id, "Author lookup timed out after comment insert");
                None
            }
        }
    }

    pub async fn list_comments(&self, target: ContentRef) -> ServiceResult<Vec<CommentThread>> {
        let comments = self.comments.list_comments(target).await?;

        let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let profiles = self.directory.get_profiles(&author_ids).await?;

        Ok(build_threads(comments, &profiles))
    }

    pub async fn toggle_comment_like(&self, actor: Option<Uuid>, comment_id: Uuid) -> ServiceResult<ToggleOutcome> {
        let result = match require_actor(actor) {
            Ok(actor_id) => self
                .comments
                .toggle_comment_like(comment_id, actor_id)
                .await
                .map(ToggleOutcome::from),
            Err(err) => Err(err),
        };
        observe("toggle_comment_like", &result);
        result
    }

    // ========== Notifications ==========

    pub async fn list_notifications(
        &self,
        actor: Option<Uuid>,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        match actor {
            Some(recipient_id) => {
                self.notifications
                    .list(recipient_id, limit, offset, unread_only)
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn unread_notification_count(&self, actor: Option<Uuid>) -> ServiceResult<i64> {
        match actor {
            Some(recipient_id) => self.notifications.unread_count(recipient_id).await,
            None => Ok(0),
        }
    }

    pub async fn mark_notification_read(&self, actor: Option<Uuid>, notification_id: Uuid) -> ServiceResult<()> {
        let recipient_id = require_actor(actor)?;
        self.notifications
            .mark_read(recipient_id, notification_id)
            .await
    }

    pub async fn mark_all_notifications_read(&self, actor: Option<Uuid>) -> ServiceResult<u64> {
        let recipient_id = require_actor(actor)?;
        let updated = self.notifications.mark_all_read(recipient_id).await?;
        info!(recipient_id = %recipient_id, updated, "Marked notifications read");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ContentKind;
    use chrono::{Duration, Utc};

    fn comment(id: Uuid, parent: Option<Uuid>, minutes: i64) -> Comment {
        Comment {
            id,
            content_id: Uuid::nil(),
            content_kind: ContentKind::Outfit,
            author_id: Uuid::nil(),
            body: "hi".to_string(),
            parent_comment_id: parent,
            created_at: Utc::now() + Duration::minutes(minutes),
            likes_count: 0,
        }
    }

    #[test]
    fn threads_keep_order_and_attach_replies() {
        let (a, b, r1, r2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let comments = vec![
            comment(a, None, 0),
            comment(r1, Some(a), 1),
            comment(b, None, 2),
            comment(r2, Some(a), 3),
        ];

        let threads = build_threads(comments, &HashMap::new());
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].root.comment.id, a);
        assert_eq!(threads[1].root.comment.id, b);
        let reply_ids: Vec<Uuid> = threads[0].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(reply_ids, vec![r1, r2]);
        assert!(threads[1].replies.is_empty());
        assert!(threads[0].root.author.is_none());
    }

    #[test]
    fn missing_actor_is_unauthorized() {
        assert!(matches!(
            require_actor(None),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
