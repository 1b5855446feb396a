//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::StorageError;
use crate::utils::db_error::{UniqueViolation, unique_violation};

const LINK_COLUMNS: &str = "id, ident, full_url, user_id, is_deleted";

#[derive(FromRow)]
struct LinkRow {
    id: i64,
    ident: String,
    full_url: String,
    user_id: i64,
    is_deleted: bool,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link::new(row.id, row.ident, row.full_url, row.user_id, row.is_deleted)
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Relies on the `links_ident_key` constraint and the partial
/// `links_full_url_active_key` index to detect collisions and duplicates.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_active_by_url(&self, full_url: &str) -> Result<Option<Link>, StorageError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE full_url = $1 AND NOT is_deleted"
        ))
        .bind(full_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Link::from))
    }

    /// Maps an insert failure for (`ident`, `full_url`) to the storage error callers expect.
    async fn insert_error(&self, e: sqlx::Error, ident: &str, full_url: &str) -> StorageError {
        match unique_violation(&e) {
            Some(UniqueViolation::Ident) => StorageError::IdentTaken(ident.to_string()),
            Some(UniqueViolation::ActiveUrl) => match self.find_active_by_url(full_url).await {
                Ok(Some(existing)) => StorageError::Conflict { existing },
                // Deleted between the insert and the lookup.
                Ok(None) => StorageError::DuplicateUrl(full_url.to_string()),
                Err(lookup) => lookup,
            },
            None => StorageError::Database(e),
        }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create_link(
        &self,
        ident: &str,
        full_url: &str,
        user_id: i64,
    ) -> Result<Link, StorageError> {
        let result = sqlx::query_as::<_, LinkRow>(&format!(
            "INSERT INTO links (ident, full_url, user_id) VALUES ($1, $2, $3) \
             RETURNING {LINK_COLUMNS}"
        ))
        .bind(ident)
        .bind(full_url)
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(e) => Err(self.insert_error(e, ident, full_url).await),
        }
    }

    async fn create_links(&self, links: Vec<NewLink>, user_id: i64) -> Result<(), StorageError> {
        let mut seen = HashSet::with_capacity(links.len());
        if let Some(repeated) = links.iter().find(|link| !seen.insert(link.full_url.as_str())) {
            return Err(StorageError::DuplicateUrl(repeated.full_url.clone()));
        }

        let mut tx = self.pool.begin().await?;

        for link in &links {
            let result =
                sqlx::query("INSERT INTO links (ident, full_url, user_id) VALUES ($1, $2, $3)")
                    .bind(&link.ident)
                    .bind(&link.full_url)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await;

            if let Err(e) = result {
                tx.rollback().await?;
                return Err(self.insert_error(e, &link.ident, &link.full_url).await);
            }
        }

        tx.commit().await?;
        tracing::debug!(user_id, link_count = links.len(), "Inserted link batch");
        Ok(())
    }

    async fn get_link_by_ident(&self, ident: &str) -> Result<Link, StorageError> {
        sqlx::query_as::<_, LinkRow>(&format!("SELECT {LINK_COLUMNS} FROM links WHERE ident = $1"))
            .bind(ident)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Link::from)
            .ok_or_else(|| StorageError::NotFound(ident.to_string()))
    }

    async fn get_links_by_idents(&self, idents: &[String]) -> Result<Vec<Link>, StorageError> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE ident = ANY($1)"
        ))
        .bind(idents)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn list_links_by_user(&self, user_id: i64) -> Result<Vec<Link>, StorageError> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE user_id = $1 AND NOT is_deleted ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn mark_deleted(&self, idents: &[String]) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE links SET is_deleted = TRUE WHERE ident = ANY($1)")
            .bind(idents)
            .execute(self.pool.as_ref())
            .await?;

        tracing::debug!(
            requested = idents.len(),
            updated = result.rows_affected(),
            "Marked links deleted"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}
