//! Shared fixtures for engagement-service integration tests.
//!
//! Everything runs against the in-memory backend; no database is required.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use engagement_service::domain::models::{
    AccountKind, ContentRef, NewNotification, Notification, Profile,
};
use engagement_service::repository::{NotificationStore, ProfileDirectory};
use engagement_service::{
    ContentSeed, EngagementService, FanoutConfig, MemoryBackend, ServiceError, ServiceResult,
    Stores,
};

pub struct TestEnv {
    pub backend: MemoryBackend,
    pub service: Arc<EngagementService>,
}

impl TestEnv {
    pub fn new() -> Self {
        let backend = MemoryBackend::new();
        let service = Arc::new(EngagementService::new(
            Stores::memory(&backend),
            FanoutConfig::default(),
        ));
        Self { backend, service }
    }

    /// Same backend, but notification writes go through `store`.
    pub fn with_notification_store(store: Arc<dyn NotificationStore>) -> Self {
        let backend = MemoryBackend::new();
        let mut stores = Stores::memory(&backend);
        stores.notifications = store;
        let service = Arc::new(EngagementService::new(
            stores,
            FanoutConfig {
                timeout: Duration::from_millis(50),
                ..FanoutConfig::default()
            },
        ));
        Self { backend, service }
    }

    /// Same backend, but profile lookups go through `directory`.
    pub fn with_directory(directory: Arc<dyn ProfileDirectory>) -> Self {
        let backend = MemoryBackend::new();
        let mut stores = Stores::memory(&backend);
        stores.directory = directory;
        let service = Arc::new(EngagementService::new(
            stores,
            FanoutConfig {
                timeout: Duration::from_millis(50),
                ..FanoutConfig::default()
            },
        ));
        Self { backend, service }
    }

    pub async fn user(&self, username: &str, full_name: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.backend
            .insert_profile(Profile {
                id,
                username: username.to_string(),
                full_name: full_name.map(str::to_string),
                avatar_url: None,
                account_kind: AccountKind::Regular,
                followers_count: 0,
                following_count: 0,
            })
            .await;
        id
    }

    pub async fn outfit(&self, owner_id: Uuid) -> ContentRef {
        self.outfit_with_likes(owner_id, 0).await
    }

    pub async fn outfit_with_likes(&self, owner_id: Uuid, likes: i64) -> ContentRef {
        let target = ContentRef::outfit(Uuid::new_v4());
        self.backend
            .insert_content(target, ContentSeed::owned_by(owner_id).with_likes(likes))
            .await;
        target
    }

    pub async fn post(&self, owner_id: Uuid) -> ContentRef {
        let target = ContentRef::post(Uuid::new_v4());
        self.backend
            .insert_content(target, ContentSeed::owned_by(owner_id))
            .await;
        target
    }

    pub async fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.service
            .list_notifications(Some(user_id), 200, 0, false)
            .await
            .expect("list notifications")
    }
}

/// Notification store whose writes always fail
#[derive(Default)]
pub struct FailingNotifications {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl NotificationStore for FailingNotifications {
    async fn create(&self, _new: NewNotification) -> ServiceResult<Notification> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ServiceError::BackendUnavailable(
            "notification store offline".to_string(),
        ))
    }

    async fn list(
        &self,
        _recipient_id: Uuid,
        _limit: i64,
        _offset: i64,
        _unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        Ok(Vec::new())
    }

    async fn unread_count(&self, _recipient_id: Uuid) -> ServiceResult<i64> {
        Ok(0)
    }

    async fn mark_read(&self, _recipient_id: Uuid, notification_id: Uuid) -> ServiceResult<()> {
        Err(ServiceError::NotFound(format!("notification {}", notification_id)))
    }

    async fn mark_all_read(&self, _recipient_id: Uuid) -> ServiceResult<u64> {
        Ok(0)
    }
}

/// Notification store whose writes never complete in time
pub struct StalledNotifications;

#[async_trait]
impl NotificationStore for StalledNotifications {
    async fn create(&self, _new: NewNotification) -> ServiceResult<Notification> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(ServiceError::BackendUnavailable("stalled".to_string()))
    }

    async fn list(
        &self,
        _recipient_id: Uuid,
        _limit: i64,
        _offset: i64,
        _unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        Ok(Vec::new())
    }

    async fn unread_count(&self, _recipient_id: Uuid) -> ServiceResult<i64> {
        Ok(0)
    }

    async fn mark_read(&self, _recipient_id: Uuid, notification_id: Uuid) -> ServiceResult<()> {
        Err(ServiceError::NotFound(format!("notification {}", notification_id)))
    }

    async fn mark_all_read(&self, _recipient_id: Uuid) -> ServiceResult<u64> {
        Ok(0)
    }
}

/// Profile directory that is down
pub struct FailingDirectory;

#[async_trait]
impl ProfileDirectory for FailingDirectory {
    async fn get_profile(&self, _user_id: Uuid) -> ServiceResult<Option<Profile>> {
        Err(ServiceError::BackendUnavailable("directory offline".to_string()))
    }

    async fn get_profiles(&self, _user_ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, Profile>> {
        Err(ServiceError::BackendUnavailable("directory offline".to_string()))
    }
}

/// Profile directory whose lookups never complete in time
pub struct StalledDirectory;

#[async_trait]
impl ProfileDirectory for StalledDirectory {
    async fn get_profile(&self, _user_id: Uuid) -> ServiceResult<Option<Profile>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn get_profiles(&self, _user_ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, Profile>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(HashMap::new())
    }
}
