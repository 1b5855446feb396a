//! Repository trait for short link data access.

use crate::domain::entities::{Link, NewLink};
use crate::error::StorageError;
use async_trait::async_trait;

/// Repository interface for owned short links.
///
/// # Implementations
///
/// - [`crate::infrastructure::memory::FileStorage`] - memory/file backend
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL backend
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a single link owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] carrying the existing link if
    /// `full_url` already has an active record.
    ///
    /// Returns [`StorageError::IdentTaken`] if `ident` is already in use.
    async fn create_link(
        &self,
        ident: &str,
        full_url: &str,
        user_id: i64,
    ) -> Result<Link, StorageError>;

    /// Creates every link in `links` for `user_id`, or none of them.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if any URL already has an active record
    /// - [`StorageError::DuplicateUrl`] if the batch repeats a URL
    /// - [`StorageError::IdentTaken`] if any ident is already in use
    async fn create_links(&self, links: Vec<NewLink>, user_id: i64) -> Result<(), StorageError>;

    /// Finds a link by ident, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no link has this ident.
    async fn get_link_by_ident(&self, ident: &str) -> Result<Link, StorageError>;

    /// Finds links by idents. Unknown idents are absent from the result.
    async fn get_links_by_idents(&self, idents: &[String]) -> Result<Vec<Link>, StorageError>;

    /// Lists the non-deleted links owned by `user_id`, in no particular order.
    async fn list_links_by_user(&self, user_id: i64) -> Result<Vec<Link>, StorageError>;

    /// Sets the deleted flag on every listed ident.
    ///
    /// Idempotent: unknown or already deleted idents are not an error.
    async fn mark_deleted(&self, idents: &[String]) -> Result<(), StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Releases backend resources. Called once during shutdown.
    async fn close(&self) -> Result<(), StorageError>;
}
