use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::NotificationStore;
use crate::domain::models::{ContentRef, NewNotification, Notification};
use crate::error::{ServiceError, ServiceResult};

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, kind, title, message, content_id, content_kind, is_read, created_at";

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    actor_id: Option<Uuid>,
    kind: String,
    title: String,
    message: Option<String>,
    content_id: Option<Uuid>,
    content_kind: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = ServiceError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let target = match (row.content_id, row.content_kind) {
            (Some(id), Some(kind)) => Some(ContentRef {
                id,
                kind: kind.parse()?,
            }),
            _ => None,
        };

        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            actor_id: row.actor_id,
            kind: row.kind.parse()?,
            title: row.title,
            message: row.message,
            target,
            read: row.is_read,
            created_at: row.created_at,
        })
    }
}

/// Repository for notification records
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, new: NewNotification) -> ServiceResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (id, recipient_id, actor_id, kind, title, message, content_id, content_kind, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, NOW())
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.recipient_id)
        .bind(new.actor_id)
        .bind(new.kind.as_str())
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.target.map(|t| t.id))
        .bind(new.target.map(|t| t.kind.as_str()))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE recipient_id = $1 AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(recipient_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn unread_count(&self, recipient_id: Uuid) -> ServiceResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, recipient_id: Uuid, notification_id: Uuid) -> ServiceResult<()> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(notification_id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "notification {}",
                notification_id
            )));
        }
        Ok(())
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> ServiceResult<u64> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }
}
