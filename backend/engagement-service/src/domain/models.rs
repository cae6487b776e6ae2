use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ServiceError;

// ============================================================================
// Profiles
// ============================================================================

/// Account kind of a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Regular,
    Company,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Regular => "regular",
            AccountKind::Company => "company",
        }
    }
}

impl FromStr for AccountKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(AccountKind::Regular),
            "company" => Ok(AccountKind::Company),
            other => Err(ServiceError::InvalidOperation(format!(
                "unknown account kind: {}",
                other
            ))),
        }
    }
}

/// Profile entity - identity anchor plus denormalized follow counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub account_kind: AccountKind,
    pub followers_count: i64,
    pub following_count: i64,
}

impl Profile {
    /// Name shown to other users: full name when set, username otherwise
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Display identity attached to comments, follower lists and notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub account_kind: AccountKind,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            account_kind: profile.account_kind,
        }
    }
}

// ============================================================================
// Follow graph
// ============================================================================

/// Follow edge - directed relationship from follower to followee
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowEdge {
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Follower/following counters of a profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowCounts {
    pub user_id: Uuid,
    pub followers_count: i64,
    pub following_count: i64,
}

/// New edge plus the followee's counters as committed with it
#[derive(Debug, Clone)]
pub struct FollowInsert {
    pub edge: FollowEdge,
    pub followee: FollowCounts,
}

/// Result of follow/unfollow as seen by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FollowOutcome {
    pub following: bool,
    pub followee: FollowCounts,
}

/// Entry of a followers/following page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowListEntry {
    pub user_id: Uuid,
    pub profile: Option<ProfileSummary>,
    pub followed_at: DateTime<Utc>,
}

// ============================================================================
// Content & engagement
// ============================================================================

/// Content variants that can receive likes, saves and comments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Outfit,
    Post,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Outfit => "outfit",
            ContentKind::Post => "post",
        }
    }

    /// Table holding the item and its counters
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Outfit => "outfits",
            ContentKind::Post => "posts",
        }
    }

    /// Only outfits can be saved
    pub fn supports_saves(&self) -> bool {
        matches!(self, ContentKind::Outfit)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "outfit" | "outfits" => Ok(ContentKind::Outfit),
            "post" | "posts" => Ok(ContentKind::Post),
            other => Err(ServiceError::InvalidOperation(format!(
                "unknown content kind: {}",
                other
            ))),
        }
    }
}

/// Reference to a single content item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentRef {
    pub id: Uuid,
    pub kind: ContentKind,
}

impl ContentRef {
    pub fn outfit(id: Uuid) -> Self {
        Self {
            id,
            kind: ContentKind::Outfit,
        }
    }

    pub fn post(id: Uuid) -> Self {
        Self {
            id,
            kind: ContentKind::Post,
        }
    }
}

/// Engagement edge kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Like,
    Save,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::Like => "like",
            EngagementKind::Save => "save",
        }
    }

    /// Counter column maintained alongside edges of this kind
    pub fn counter_column(&self) -> &'static str {
        match self {
            EngagementKind::Like => "likes_count",
            EngagementKind::Save => "saves_count",
        }
    }
}

/// Engagement edge - a like or save of one actor on one content item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEdge {
    pub id: Uuid,
    pub target: ContentRef,
    pub kind: EngagementKind,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Store-level toggle result; carries the owner so fan-out needs no extra read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleResult {
    pub active: bool,
    pub count: i64,
    pub owner_id: Uuid,
}

/// Toggle result returned to callers for reconciling optimistic state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub active: bool,
    pub count: i64,
}

impl From<ToggleResult> for ToggleOutcome {
    fn from(result: ToggleResult) -> Self {
        Self {
            active: result.active,
            count: result.count,
        }
    }
}

/// Aggregate counters of a content item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentCounts {
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub likes_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saves_count: Option<i64>,
    pub comments_count: i64,
}

// ============================================================================
// Comments
// ============================================================================

/// Comment entity - replies point at a top-level parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub author_id: Uuid,
    pub body: String,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub target: ContentRef,
    pub author_id: Uuid,
    pub body: String,
    pub parent_comment_id: Option<Uuid>,
}

/// Stored comment plus the owner of the commented item
#[derive(Debug, Clone)]
pub struct CommentInsert {
    pub comment: Comment,
    pub content_owner_id: Uuid,
}

/// Comment with its author's display identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<ProfileSummary>,
}

/// Top-level comment with its direct replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub root: CommentView,
    pub replies: Vec<CommentView>,
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification kinds produced by fan-out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    Save,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Save => "save",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "follow" => Ok(NotificationKind::Follow),
            "like" => Ok(NotificationKind::Like),
            "comment" => Ok(NotificationKind::Comment),
            "save" => Ok(NotificationKind::Save),
            other => Err(ServiceError::InvalidOperation(format!(
                "unknown notification kind: {}",
                other
            ))),
        }
    }
}

/// Notification record; actor and target are stored, not reconstructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    pub target: Option<ContentRef>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: Option<String>,
    pub target: Option<ContentRef>,
}
