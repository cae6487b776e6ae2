use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::EngagementStore;
use crate::domain::models::{ContentCounts, ContentKind, ContentRef, EngagementKind, ToggleResult};
use crate::error::{ServiceError, ServiceResult};

/// Take a transaction-scoped advisory lock; released on commit or rollback.
pub(crate) async fn lock_key(conn: &mut PgConnection, key: &str) -> ServiceResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key)
        .execute(conn)
        .await?;
    Ok(())
}

/// Repository for like/save edges on outfits and posts
#[derive(Clone)]
pub struct PgEngagementStore {
    pool: PgPool,
}

impl PgEngagementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementStore for PgEngagementStore {
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

        let table = target.kind.table();
        let column = kind.counter_column();

        let mut tx = self.pool.begin().await?;
        lock_key(
            &mut *tx,
            &format!("{}:{}:{}:{}", kind.as_str(), target.kind, target.id, actor_id),
        )
        .await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM engagements
            WHERE content_id = $1 AND content_kind = $2 AND kind = $3 AND actor_id = $4
            "#,
        )
        .bind(target.id)
        .bind(target.kind.as_str())
        .bind(kind.as_str())
        .bind(actor_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let counter_sql = if removed {
            format!(
                "UPDATE {table} SET {column} = GREATEST({column} - 1, 0) WHERE id = $1 RETURNING {column}, user_id"
            )
        } else {
            sqlx::query(
                r#"
                INSERT INTO engagements (id, content_id, content_kind, kind, actor_id, created_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(target.id)
            .bind(target.kind.as_str())
            .bind(kind.as_str())
            .bind(actor_id)
            .execute(&mut *tx)
            .await?;

            format!("UPDATE {table} SET {column} = {column} + 1 WHERE id = $1 RETURNING {column}, user_id")
        };

        // No row means the item does not exist; dropping tx rolls the edge write back.
        let (count, owner_id): (i64, Uuid) = sqlx::query_as(&counter_sql)
            .bind(target.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {}", target.kind, target.id)))?;

        tx.commit().await?;

        debug!(
            content_id = %target.id,
            content_kind = %target.kind,
            kind = kind.as_str(),
            actor_id = %actor_id,
            active = !removed,
            count,
            "Toggled engagement"
        );

        Ok(ToggleResult {
            active: !removed,
            count,
            owner_id,
        })
    }

    async fn is_engaged(
        &self,
        target: ContentRef,
        kind: EngagementKind,
        actor_id: Uuid,
    ) -> ServiceResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM engagements
                WHERE content_id = $1 AND content_kind = $2 AND kind = $3 AND actor_id = $4
            )
            "#,
        )
        .bind(target.id)
        .bind(target.kind.as_str())
        .bind(kind.as_str())
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn counts(&self, target: ContentRef) -> ServiceResult<ContentCounts> {
        let not_found = || ServiceError::NotFound(format!("{} {}", target.kind, target.id));

        let counts = match target.kind {
            ContentKind::Outfit => {
                let (likes_count, saves_count, comments_count): (i64, i64, i64) = sqlx::query_as(
                    "SELECT likes_count, saves_count, comments_count FROM outfits WHERE id = $1",
                )
                .bind(target.id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(not_found)?;

                ContentCounts {
                    content_id: target.id,
                    content_kind: target.kind,
                    likes_count,
                    saves_count: Some(saves_count),
                    comments_count,
                }
            }
            ContentKind::Post => {
                let (likes_count, comments_count): (i64, i64) =
                    sqlx::query_as("SELECT likes_count, comments_count FROM posts WHERE id = $1")
                        .bind(target.id)
                        .fetch_optional(&self.pool)
                        .await?
                        .ok_or_else(not_found)?;

                ContentCounts {
                    content_id: target.id,
                    content_kind: target.kind,
                    likes_count,
                    saves_count: None,
                    comments_count,
                }
            }
        };

        Ok(counts)
    }
}
