//! In-process backend implementing every store trait.
//!
//! All state sits behind one async mutex, so each operation is applied as a
//! single serialized unit, mirroring the per-key transactions of the
//! PostgreSQL stores. Used by the test suites and local development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CommentStore, EngagementStore, NotificationStore, ProfileDirectory, RelationshipStore};
use crate::domain::models::{
    Comment, CommentInsert, ContentCounts, ContentRef, EngagementEdge, EngagementKind,
    FollowCounts, FollowEdge, FollowInsert, NewComment, NewNotification, Notification, Profile, ToggleResult,
};
use crate::error::{ServiceError, ServiceResult};

/// Owner and starting counters of a content item registered in memory
#[derive(Debug, Clone, Copy)]
pub struct ContentSeed {
    pub owner_id: Uuid,
    pub likes_count: i64,
    pub saves_count: i64,
    pub comments_count: i64,
}

impl ContentSeed {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            likes_count: 0,
            saves_count: 0,
            comments_count: 0,
        }
    }

    pub fn with_likes(mut self, likes_count: i64) -> Self {
        self.likes_count = likes_count;
        self
    }
}

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<Uuid, Profile>,
    follows: Vec<FollowEdge>,
    content: HashMap<ContentRef, ContentSeed>,
    engagements: Vec<EngagementEdge>,
    comments: Vec<Comment>,
    comment_likes: HashSet<(Uuid, Uuid)>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn content_mut(&mut self, target: ContentRef) -> ServiceResult<&mut ContentSeed> {
        self.content
            .get_mut(&target)
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", target.kind, target.id)))
    }

    /// Same outcome as a profile foreign-key violation in PostgreSQL.
    fn require_profile(&self, user_id: Uuid) -> ServiceResult<()> {
        if self.profiles.contains_key(&user_id) {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("profile {}", user_id)))
        }
    }

    fn profile_mut(&mut self, user_id: Uuid) -> ServiceResult<&mut Profile> {
        self.profiles
            .get_mut(&user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))
    }
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.state.lock().await.profiles.insert(profile.id, profile);
    }

    pub async fn insert_content(&self, target: ContentRef, seed: ContentSeed) {
        self.state.lock().await.content.insert(target, seed);
    }

    /// Number of engagement edges of `kind` on `target`
    pub async fn edge_count(&self, target: ContentRef, kind: EngagementKind) -> usize {
        self.state
            .lock()
            .await
            .engagements
            .iter()
            .filter(|e| e.target == target && e.kind == kind)
            .count()
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl RelationshipStore for MemoryBackend {
    async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<FollowInsert> {
        if follower_id == followee_id {
            return Err(ServiceError::InvalidOperation(
                "users cannot follow themselves".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        if !state.profiles.contains_key(&follower_id) || !state.profiles.contains_key(&followee_id)
        {
            return Err(ServiceError::NotFound("profile not found".to_string()));
        }
        if state
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.followee_id == followee_id)
        {
            return Err(ServiceError::AlreadyExists("already following".to_string()));
        }

        let edge = FollowEdge {
            follower_id,
            followee_id,
            created_at: Utc::now(),
        };
        state.follows.push(edge.clone());
        state.profile_mut(follower_id)?.following_count += 1;
        let followee = state.profile_mut(followee_id)?;
        followee.followers_count += 1;

        Ok(FollowInsert {
            edge,
            followee: FollowCounts {
                user_id: followee_id,
                followers_count: followee.followers_count,
                following_count: followee.following_count,
            },
        })
    }

    async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<FollowCounts> {
        let mut state = self.state.lock().await;
        let position = state
            .follows
            .iter()
            .position(|e| e.follower_id == follower_id && e.followee_id == followee_id)
            .ok_or_else(|| ServiceError::NotFound("not following".to_string()))?;
        state.follows.remove(position);

        if let Ok(follower) = state.profile_mut(follower_id) {
            follower.following_count = (follower.following_count - 1).max(0);
        }
        let followee = state.profile_mut(followee_id)?;
        followee.followers_count = (followee.followers_count - 1).max(0);
        Ok(FollowCounts {
            user_id: followee_id,
            followers_count: followee.followers_count,
            following_count: followee.following_count,
        })
    }

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.followee_id == followee_id))
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowEdge>> {
        let state = self.state.lock().await;
        Ok(page(
            state
                .follows
                .iter()
                .rev()
                .filter(|e| e.followee_id == user_id)
                .cloned(),
            limit,
            offset,
        ))
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowEdge>> {
        let state = self.state.lock().await;
        Ok(page(
            state
                .follows
                .iter()
                .rev()
                .filter(|e| e.follower_id == user_id)
                .cloned(),
            limit,
            offset,
        ))
    }

    async fn follow_counts(&self, user_id: Uuid) -> ServiceResult<FollowCounts> {
        let mut state = self.state.lock().await;
        let profile = state.profile_mut(user_id)?;
        Ok(FollowCounts {
            user_id,
            followers_count: profile.followers_count,
            following_count: profile.following_count,
        })
    }
}

#[async_trait]
impl EngagementStore for MemoryBackend {
    async fn toggle(
        &self,
        target: ContentRef,
        kind: EngagementKind,
        actor_id: Uuid,
    ) -> ServiceResult<ToggleResult> {
        if kind == EngagementKind::Save && !target.kind.supports_saves() {
            return Err(ServiceError::InvalidOperation(format!(
                "{} items cannot be saved",
                target.kind
            )));
        }

        let mut state = self.state.lock().await;
        // Resolve the item and actor first so a failure leaves edges untouched.
        state.content_mut(target)?;
        state.require_profile(actor_id)?;

        let existing = state
            .engagements
            .iter()
            .position(|e| e.target == target && e.kind == kind && e.actor_id == actor_id);
        let active = match existing {
            Some(position) => {
                state.engagements.remove(position);
                false
            }
            None => {
                state.engagements.push(EngagementEdge {
                    id: Uuid::new_v4(),
                    target,
                    kind,
                    actor_id,
                    created_at: Utc::now(),
                });
                true
            }
        };

        let seed = state.content_mut(target)?;
        let counter = match kind {
            EngagementKind::Like => &mut seed.likes_count,
            EngagementKind::Save => &mut seed.saves_count,
        };
        *counter = if active { *counter + 1 } else { (*counter - 1).max(0) };

        Ok(ToggleResult {
            active,
            count: *counter,
            owner_id: seed.owner_id,
        })
    }

    async fn is_engaged(
        &self,
        target: ContentRef,
        kind: EngagementKind,
        actor_id: Uuid,
    ) -> ServiceResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .engagements
            .iter()
            .any(|e| e.target == target && e.kind == kind && e.actor_id == actor_id))
    }

    async fn counts(&self, target: ContentRef) -> ServiceResult<ContentCounts> {
        let mut state = self.state.lock().await;
        let seed = state.content_mut(target)?;
        Ok(ContentCounts {
            content_id: target.id,
            content_kind: target.kind,
            likes_count: seed.likes_count,
            saves_count: target.kind.supports_saves().then_some(seed.saves_count),
            comments_count: seed.comments_count,
        })
    }
}

#[async_trait]
impl CommentStore for MemoryBackend {
    async fn add_comment(&self, new: NewComment) -> ServiceResult<CommentInsert> {
        let mut state = self.state.lock().await;
        state.content_mut(new.target)?;
        state.require_profile(new.author_id)?;

        if let Some(parent_id) = new.parent_comment_id {
            let parent = state
                .comments
                .iter()
                .find(|c| c.id == parent_id)
                .ok_or_else(|| ServiceError::NotFound(format!("comment {}", parent_id)))?;
            if parent.parent_comment_id.is_some() {
                return Err(ServiceError::InvalidOperation(
                    "replies cannot be nested more than one level".to_string(),
                ));
            }
            if parent.content_id != new.target.id || parent.content_kind != new.target.kind {
                return Err(ServiceError::InvalidOperation(
                    "parent comment belongs to a different item".to_string(),
                ));
            }
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            content_id: new.target.id,
            content_kind: new.target.kind,
            author_id: new.author_id,
            body: new.body,
            parent_comment_id: new.parent_comment_id,
            created_at: Utc::now(),
            likes_count: 0,
        };
        state.comments.push(comment.clone());

        let seed = state.content_mut(new.target)?;
        seed.comments_count += 1;

        Ok(CommentInsert {
            comment,
            content_owner_id: seed.owner_id,
        })
    }

    async fn list_comments(&self, target: ContentRef) -> ServiceResult<Vec<Comment>> {
        Ok(self
            .state
            .lock()
            .await
            .comments
            .iter()
            .filter(|c| c.content_id == target.id && c.content_kind == target.kind)
            .cloned()
            .collect())
    }

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
    ) -> ServiceResult<ToggleResult> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.require_profile(actor_id)?;

        let comment = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", comment_id)))?;

        let active = if state.comment_likes.remove(&(comment_id, actor_id)) {
            comment.likes_count = (comment.likes_count - 1).max(0);
            false
        } else {
            state.comment_likes.insert((comment_id, actor_id));
            comment.likes_count += 1;
            true
        };

        Ok(ToggleResult {
            active,
            count: comment.likes_count,
            owner_id: comment.author_id,
        })
    }
}

#[async_trait]
impl NotificationStore for MemoryBackend {
    async fn create(&self, new: NewNotification) -> ServiceResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: new.recipient_id,
            actor_id: new.actor_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            target: new.target,
            read: false,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        let state = self.state.lock().await;
        Ok(page(
            state
                .notifications
                .iter()
                .rev()
                .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.read))
                .cloned(),
            limit,
            offset,
        ))
    }

    async fn unread_count(&self, recipient_id: Uuid) -> ServiceResult<i64> {
        Ok(self
            .state
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as i64)
    }

    async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> ServiceResult<()> {
        let mut state = self.state.lock().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == recipient_id)
            .ok_or_else(|| ServiceError::NotFound(format!("notification {}", notification_id)))?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> ServiceResult<u64> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
        {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl ProfileDirectory for MemoryBackend {
    async fn get_profile(&self, user_id: Uuid) -> ServiceResult<Option<Profile>> {
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, Profile>> {
        let state = self.state.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }
}
