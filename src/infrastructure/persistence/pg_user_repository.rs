//! PostgreSQL implementation of user repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repositories::UserRepository;
use crate::error::StorageError;

/// Allocates user ids from the `users` sequence.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self) -> Result<i64, StorageError> {
        let id = sqlx::query_scalar::<_, i64>("INSERT INTO users DEFAULT VALUES RETURNING id")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(id)
    }
}
