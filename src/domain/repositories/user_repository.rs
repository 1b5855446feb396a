//! Repository trait for pseudo-anonymous user identities.

use crate::error::StorageError;
use async_trait::async_trait;

/// Allocates user identities.
///
/// Users carry no data besides their sequential id; they exist only to tag
/// link ownership.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Allocates the next user id.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] on backend failures.
    async fn create_user(&self) -> Result<i64, StorageError>;
}
