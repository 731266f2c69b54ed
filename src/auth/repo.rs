use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::UserRecord;

/// Read access to the principals tokens are issued for.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<UserRecord>>;
    async fn find_by_id(&self, id: u64) -> anyhow::Result<Option<UserRecord>>;
}

#[derive(Clone)]
pub struct PgPrincipalStore {
    db: PgPool,
}

impl PgPrincipalStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, role
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: u64) -> anyhow::Result<Option<UserRecord>> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
