use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::engagements::lock_key;
use super::RelationshipStore;
use crate::domain::models::{FollowCounts, FollowEdge, FollowInsert};
use crate::error::{ServiceError, ServiceResult};

fn follow_key(follower_id: Uuid, followee_id: Uuid) -> String {
    format!("follow:{}:{}", follower_id, followee_id)
}

/// PostgreSQL follow graph (source of truth for follower counters)
#[derive(Clone)]
pub struct PgRelationshipStore {
    pool: PgPool,
}

impl PgRelationshipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationshipStore for PgRelationshipStore {
    async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<FollowInsert> {
        if follower_id == followee_id {
            return Err(ServiceError::InvalidOperation(
                "users cannot follow themselves".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        lock_key(&mut *tx, &follow_key(follower_id, followee_id)).await?;

        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE id = ANY($1)")
            .bind(&[follower_id, followee_id][..])
            .fetch_one(&mut *tx)
            .await?;
        if known < 2 {
            return Err(ServiceError::NotFound("profile not found".to_string()));
        }

        let edge = sqlx::query_as::<_, FollowEdge>(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            RETURNING follower_id, followee_id, created_at
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::AlreadyExists("already following".to_string()))?;

        let (followers_count, following_count): (i64, i64) = sqlx::query_as(
            r#"
            UPDATE profiles SET followers_count = followers_count + 1
            WHERE id = $1
            RETURNING followers_count, following_count
            "#,
        )
        .bind(followee_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE profiles SET following_count = following_count + 1 WHERE id = $1")
            .bind(follower_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Created follow: {} -> {}", follower_id, followee_id);
        Ok(FollowInsert {
            edge,
            followee: FollowCounts {
                user_id: followee_id,
                followers_count,
                following_count,
            },
        })
    }

    async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<FollowCounts> {
        let mut tx = self.pool.begin().await?;
        lock_key(&mut *tx, &follow_key(follower_id, followee_id)).await?;

        let affected = sqlx::query(
            r#"
            DELETE FROM follows
            WHERE follower_id = $1 AND followee_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(ServiceError::NotFound("not following".to_string()));
        }

        let (followers_count, following_count): (i64, i64) = sqlx::query_as(
            r#"
            UPDATE profiles SET followers_count = GREATEST(followers_count - 1, 0)
            WHERE id = $1
            RETURNING followers_count, following_count
            "#,
        )
        .bind(followee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {}", followee_id)))?;
        sqlx::query(
            "UPDATE profiles SET following_count = GREATEST(following_count - 1, 0) WHERE id = $1",
        )
        .bind(follower_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Deleted follow: {} -> {}", follower_id, followee_id);
        Ok(FollowCounts {
            user_id: followee_id,
            followers_count,
            following_count,
        })
    }

    async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM follows
                WHERE follower_id = $1 AND followee_id = $2
            )
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowEdge>> {
        let edges = sqlx::query_as::<_, FollowEdge>(
            r#"
            SELECT follower_id, followee_id, created_at
            FROM follows
            WHERE followee_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<FollowEdge>> {
        let edges = sqlx::query_as::<_, FollowEdge>(
            r#"
            SELECT follower_id, followee_id, created_at
            FROM follows
            WHERE follower_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    async fn follow_counts(&self, user_id: Uuid) -> ServiceResult<FollowCounts> {
        let (followers_count, following_count): (i64, i64) = sqlx::query_as(
            "SELECT followers_count, following_count FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))?;

        Ok(FollowCounts {
            user_id,
            followers_count,
            following_count,
        })
    }
}
