use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::ProfileDirectory;
use crate::domain::models::Profile;
use crate::error::{ServiceError, ServiceResult};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    username: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    account_kind: String,
    followers_count: i64,
    following_count: i64,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = ServiceError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            account_kind: row.account_kind.parse()?,
            followers_count: row.followers_count,
            following_count: row.following_count,
        })
    }
}

/// Profile lookups against the `profiles` table
#[derive(Clone)]
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn get_profile(&self, user_id: Uuid) -> ServiceResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, username, full_name, avatar_url, account_kind, followers_count, following_count
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, Profile>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, username, full_name, avatar_url, account_kind, followers_count, following_count
            FROM profiles
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Profile::try_from(row).map(|p| (p.id, p)))
            .collect()
    }
}
