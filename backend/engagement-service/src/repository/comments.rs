use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::engagements::lock_key;
use super::CommentStore;
use crate::domain::models::{Comment, CommentInsert, ContentRef, NewComment, ToggleResult};
use crate::error::{ServiceError, ServiceResult};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    content_id: Uuid,
    content_kind: String,
    author_id: Uuid,
    body: String,
    parent_comment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    likes_count: i64,
}

impl TryFrom<CommentRow> for Comment {
    type Error = ServiceError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: row.id,
            content_id: row.content_id,
            content_kind: row.content_kind.parse()?,
            author_id: row.author_id,
            body: row.body,
            parent_comment_id: row.parent_comment_id,
            created_at: row.created_at,
            likes_count: row.likes_count,
        })
    }
}

/// Repository for Comment operations
#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn add_comment(&self, new: NewComment) -> ServiceResult<CommentInsert> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = new.parent_comment_id {
            let (parent_content_id, parent_content_kind, grandparent): (Uuid, String, Option<Uuid>) =
                sqlx::query_as(
                    "SELECT content_id, content_kind, parent_comment_id FROM comments WHERE id = $1",
                )
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("comment {}", parent_id)))?;

            if grandparent.is_some() {
                return Err(ServiceError::InvalidOperation(
                    "replies cannot be nested more than one level".to_string(),
                ));
            }
            if parent_content_id != new.target.id || parent_content_kind != new.target.kind.as_str()
            {
                return Err(ServiceError::InvalidOperation(
                    "parent comment belongs to a different item".to_string(),
                ));
            }
        }

        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, content_id, content_kind, author_id, body, parent_comment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, content_id, content_kind, author_id, body, parent_comment_id, created_at, likes_count
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.target.id)
        .bind(new.target.kind.as_str())
        .bind(new.author_id)
        .bind(&new.body)
        .bind(new.parent_comment_id)
        .fetch_one(&mut *tx)
        .await?;

        let content_owner_id: Uuid = sqlx::query_scalar(&format!(
            "UPDATE {} SET comments_count = comments_count + 1 WHERE id = $1 RETURNING user_id",
            new.target.kind.table()
        ))
        .bind(new.target.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {}", new.target.kind, new.target.id)))?;

        tx.commit().await?;

        Ok(CommentInsert {
            comment: row.try_into()?,
            content_owner_id,
        })
    }

    async fn list_comments(&self, target: ContentRef) -> ServiceResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, content_id, content_kind, author_id, body, parent_comment_id, created_at, likes_count
            FROM comments
            WHERE content_id = $1 AND content_kind = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(target.id)
        .bind(target.kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Comment::try_from).collect()
    }

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        actor_id: Uuid,
    ) -> ServiceResult<ToggleResult> {
        let mut tx = self.pool.begin().await?;
        lock_key(&mut *tx, &format!("comment_like:{}:{}", comment_id, actor_id)).await?;

        let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND actor_id = $2")
            .bind(comment_id)
            .bind(actor_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let counter_sql = if removed {
            "UPDATE comments SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1 RETURNING likes_count, author_id"
        } else {
            sqlx::query(
                "INSERT INTO comment_likes (comment_id, actor_id, created_at) VALUES ($1, $2, NOW())",
            )
            .bind(comment_id)
            .bind(actor_id)
            .execute(&mut *tx)
            .await?;

            "UPDATE comments SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count, author_id"
        };

        let (count, owner_id): (i64, Uuid) = sqlx::query_as(counter_sql)
            .bind(comment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", comment_id)))?;

        tx.commit().await?;

        Ok(ToggleResult {
            active: !removed,
            count,
            owner_id,
        })
    }
}
