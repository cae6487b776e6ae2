use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::models::{
    Comment, CommentInsert, ContentCounts, ContentRef, EngagementKind, FollowCounts, FollowEdge,
    FollowInsert, NewComment, NewNotification, Notification, Profile, ToggleResult,
};
use crate::error::ServiceResult;

pub mod comments;
pub mod engagements;
pub mod follows;
pub mod memory;
pub mod notifications;
pub mod profiles;

pub use comments::PgCommentStore;
pub use engagements::PgEngagementStore;
pub use follows::PgRelationshipStore;
pub use memory::{ContentSeed, MemoryBackend};
pub use notifications::PgNotificationStore;
pub use profiles::PgProfileDirectory;

/// Follow edges and the follower/following counters they drive.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Insert an edge and bump both counters; `AlreadyExists` on a duplicate.
    async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<FollowInsert>;

    /// Remove an edge and decrement both counters (floored at 0); `NotFound` if absent.
    /// Returns the followee's counters after the change.
    async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<FollowCounts>;

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<bool>;

    /// Edges pointing at `user_id`, newest first
    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowEdge>>;

    /// Edges leaving `user_id`, newest first
    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowEdge>>;

    async fn follow_counts(&self, user_id: Uuid) -> ServiceResult<FollowCounts>;
}

/// Like/save edges and per-item counters.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Flip membership of (target, kind, actor) and adjust the counter in one
    /// transaction serialized on that key.
    async fn toggle(
        &self,
        target: ContentRef,
        kind: EngagementKind,
        actor_id: Uuid,
    ) -> ServiceResult<ToggleResult>;

    async fn is_engaged(
        &self,
        target: ContentRef,
        kind: EngagementKind,
        actor_id: Uuid,
    ) -> ServiceResult<bool>;

    async fn counts(&self, target: ContentRef) -> ServiceResult<ContentCounts>;
}

/// Threaded comments (one reply level) and `comments_count`.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn add_comment(&self, new: NewComment) -> ServiceResult<CommentInsert>;

    /// Every comment on the item, oldest first
    async fn list_comments(&self, target: ContentRef) -> ServiceResult<Vec<Comment>>;

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
    ) -> ServiceResult<ToggleResult>;
}

/// Durable notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, new: NewNotification) -> ServiceResult<Notification>;

    /// Newest first
    async fn list(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>>;

    async fn unread_count(&self, recipient_id: Uuid) -> ServiceResult<i64>;

    /// `NotFound` unless the notification exists and belongs to `recipient_id`
    async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> ServiceResult<()>;

    /// Returns the number of notifications flipped to read
    async fn mark_all_read(&self, recipient_id: Uuid) -> ServiceResult<u64>;
}

/// Read-only profile lookups.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> ServiceResult<Option<Profile>>;

    async fn get_profiles(&self, user_ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, Profile>>;
}
