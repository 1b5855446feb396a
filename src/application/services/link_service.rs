//! Link creation, lookup, listing, and delete authorization.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::{AppError, StorageError};
use crate::utils::ident_generator::generate_ident;
use crate::utils::url_check::validate_url;
use serde_json::json;

/// Attempts at finding a free ident before giving up.
const MAX_IDENT_ATTEMPTS: usize = 10;

/// Outcome of shortening a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub ident: String,
    /// True when the URL was already shortened and `ident` is the existing one.
    pub conflict: bool,
}

/// One entry of a batch shortening request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub correlation_id: String,
    pub url: String,
}

/// One entry of a batch shortening result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub correlation_id: String,
    pub ident: String,
}

/// Service for creating, resolving and listing owned short links.
pub struct LinkService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
    base_url: String,
}

impl<L: LinkRepository + ?Sized> LinkService<L> {
    /// Creates a new link service.
    ///
    /// `base_url` is the public prefix of short links, e.g. `http://localhost:8080`.
    pub fn new(link_repository: Arc<L>, base_url: impl Into<String>) -> Self {
        Self {
            link_repository,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Shortens `url` on behalf of `user_id`.
    ///
    /// If the URL already has an active link, returns that link's ident with
    /// `conflict = true` instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is not an absolute HTTP(S) URL.
    /// Returns [`AppError::Internal`] on storage failures or repeated ident collisions.
    pub async fn shorten(&self, url: &str, user_id: i64) -> Result<Shortened, AppError> {
        check_url(url)?;

        for _ in 0..MAX_IDENT_ATTEMPTS {
            let ident = generate_ident(url);

            match self.link_repository.create_link(&ident, url, user_id).await {
                Ok(link) => {
                    return Ok(Shortened {
                        ident: link.ident,
                        conflict: false,
                    });
                }
                Err(StorageError::Conflict { existing }) => {
                    tracing::debug!(ident = %existing.ident, "URL already shortened");
                    return Ok(Shortened {
                        ident: existing.ident,
                        conflict: true,
                    });
                }
                Err(StorageError::IdentTaken(taken)) => {
                    tracing::warn!(ident = %taken, "Ident collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal(
            "Failed to generate unique ident",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    /// Shortens every entry in one all-or-nothing storage call.
    ///
    /// Results keep the order and correlation ids of `entries`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the batch is empty or any URL is invalid.
    /// Returns [`AppError::Conflict`] if any URL is already shortened or repeated;
    /// nothing is stored in that case.
    /// Returns [`AppError::Internal`] on storage failures.
    pub async fn shorten_batch(
        &self,
        entries: Vec<BatchEntry>,
        user_id: i64,
    ) -> Result<Vec<BatchResult>, AppError> {
        if entries.is_empty() {
            return Err(AppError::bad_request("Batch is empty", json!({})));
        }

        for entry in &entries {
            check_url(&entry.url).map_err(|_| {
                AppError::bad_request(
                    "Invalid URL format",
                    json!({ "correlation_id": entry.correlation_id, "url": entry.url }),
                )
            })?;
        }

        for _ in 0..MAX_IDENT_ATTEMPTS {
            let links: Vec<NewLink> = entries
                .iter()
                .map(|entry| NewLink::new(generate_ident(&entry.url), entry.url.clone()))
                .collect();

            let results = entries
                .iter()
                .zip(&links)
                .map(|(entry, link)| BatchResult {
                    correlation_id: entry.correlation_id.clone(),
                    ident: link.ident.clone(),
                })
                .collect();

            match self.link_repository.create_links(links, user_id).await {
                Ok(()) => return Ok(results),
                Err(StorageError::IdentTaken(taken)) => {
                    tracing::warn!(ident = %taken, "Ident collision in batch, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal(
            "Failed to generate unique ident",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    /// Retrieves a link by ident, including soft-deleted ones.
    ///
    /// Callers distinguish "gone" from "not found" via [`Link::is_deleted`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link has this ident.
    pub async fn resolve(&self, ident: &str) -> Result<Link, AppError> {
        self.link_repository
            .get_link_by_ident(ident)
            .await
            .map_err(AppError::from)
    }

    /// Lists the active links owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage failures.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Link>, AppError> {
        Ok(self.link_repository.list_links_by_user(user_id).await?)
    }

    /// Checks that `user_id` owns every existing link among `idents`.
    ///
    /// Idents that match no link do not fail the check.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage failures.
    pub async fn authorize_delete(
        &self,
        user_id: i64,
        idents: &[String],
    ) -> Result<bool, AppError> {
        if idents.is_empty() {
            return Ok(true);
        }

        let links = self.link_repository.get_links_by_idents(idents).await?;

        let requested: HashSet<&str> = idents.iter().map(String::as_str).collect();
        let unknown = requested.len().saturating_sub(links.len());
        if unknown > 0 {
            tracing::debug!(user_id, unknown, "Delete request names unknown idents");
        }

        Ok(links.iter().all(|link| link.is_owned_by(user_id)))
    }

    /// Checks that the storage backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the backend does not answer.
    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.link_repository.ping().await?)
    }

    /// Builds the public short URL for `ident`.
    pub fn short_url(&self, ident: &str) -> String {
        format!("{}/{}", self.base_url, ident)
    }
}

/// Rejects anything but an absolute HTTP(S) URL with a `400`.
pub fn check_url(url: &str) -> Result<(), AppError> {
    validate_url(url).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;

    fn link(id: i64, ident: &str, url: &str, user_id: i64) -> Link {
        Link::new(id, ident.to_string(), url.to_string(), user_id, false)
    }

    fn service(repo: MockLinkRepository) -> LinkService<MockLinkRepository> {
        LinkService::new(Arc::new(repo), "http://localhost:8080/")
    }

    #[tokio::test]
    async fn test_shorten_success() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create_link()
            .withf(|ident, url, user_id| {
                ident.len() == 12 && url == "https://example.com" && *user_id == 1
            })
            .times(1)
            .returning(|ident, url, user_id| Ok(link(10, ident, url, user_id)));

        let result = service(mock_repo)
            .shorten("https://example.com", 1)
            .await
            .unwrap();

        assert!(!result.conflict);
        assert_eq!(result.ident.len(), 12);
    }

    #[tokio::test]
    async fn test_shorten_conflict_returns_existing_ident() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create_link()
            .times(1)
            .returning(|_, url, _| {
                Err(StorageError::Conflict {
                    existing: link(5, "existing", url, 2),
                })
            });

        let result = service(mock_repo)
            .shorten("https://example.com", 1)
            .await
            .unwrap();

        assert_eq!(
            result,
            Shortened {
                ident: "existing".to_string(),
                conflict: true
            }
        );
    }

    #[tokio::test]
    async fn test_shorten_retries_on_ident_collision() {
        let mut mock_repo = MockLinkRepository::new();
        let mut seq = mockall::Sequence::new();
        mock_repo
            .expect_create_link()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|ident, _, _| Err(StorageError::IdentTaken(ident.to_string())));
        mock_repo
            .expect_create_link()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|ident, url, user_id| Ok(link(11, ident, url, user_id)));

        let result = service(mock_repo).shorten("https://example.com", 1).await;

        assert!(result.is_ok());
        assert!(!result.unwrap().conflict);
    }

    #[tokio::test]
    async fn test_shorten_gives_up_after_repeated_collisions() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create_link()
            .times(MAX_IDENT_ATTEMPTS)
            .returning(|ident, _, _| Err(StorageError::IdentTaken(ident.to_string())));

        let result = service(mock_repo).shorten("https://example.com", 1).await;

        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_shorten_invalid_url() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_create_link().times(0);

        let result = service(mock_repo).shorten("not-a-url", 1).await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_shorten_storage_failure() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create_link()
            .times(1)
            .returning(|_, _, _| Err(StorageError::Io(std::io::Error::other("disk full"))));

        let result = service(mock_repo).shorten("https://example.com", 1).await;

        assert!(matches!(result, Err(AppError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_shorten_batch_keeps_correlation_order() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create_links()
            .withf(|links, user_id| links.len() == 2 && *user_id == 9)
            .times(1)
            .returning(|_, _| Ok(()));

        let entries = vec![
            BatchEntry {
                correlation_id: "first".to_string(),
                url: "https://a.example".to_string(),
            },
            BatchEntry {
                correlation_id: "second".to_string(),
                url: "https://b.example".to_string(),
            },
        ];

        let results = service(mock_repo).shorten_batch(entries, 9).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].correlation_id, "first");
        assert_eq!(results[1].correlation_id, "second");
        assert_ne!(results[0].ident, results[1].ident);
    }

    #[tokio::test]
    async fn test_shorten_batch_failure_is_atomic() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create_links()
            .times(1)
            .returning(|_, _| Err(StorageError::DuplicateUrl("https://a.example".to_string())));

        let entries = vec![
            BatchEntry {
                correlation_id: "1".to_string(),
                url: "https://a.example".to_string(),
            },
            BatchEntry {
                correlation_id: "2".to_string(),
                url: "https://a.example".to_string(),
            },
        ];

        let result = service(mock_repo).shorten_batch(entries, 1).await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_shorten_batch_rejects_empty_and_invalid() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_create_links().times(0);
        let service = service(mock_repo);

        let empty = service.shorten_batch(vec![], 1).await;
        assert!(matches!(empty, Err(AppError::Validation { .. })));

        let invalid = service
            .shorten_batch(
                vec![BatchEntry {
                    correlation_id: "x".to_string(),
                    url: "mailto:someone@example.com".to_string(),
                }],
                1,
            )
            .await;
        assert!(matches!(invalid, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_resolve_returns_deleted_links() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_get_link_by_ident()
            .withf(|ident| ident == "gone1")
            .times(1)
            .returning(|ident| {
                Ok(Link::new(
                    1,
                    ident.to_string(),
                    "https://a.com".to_string(),
                    1,
                    true,
                ))
            });

        let link = service(mock_repo).resolve("gone1").await.unwrap();

        assert!(link.is_deleted);
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_get_link_by_ident()
            .times(1)
            .returning(|ident| Err(StorageError::NotFound(ident.to_string())));

        let result = service(mock_repo).resolve("missing").await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_authorize_delete_all_owned() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_get_links_by_idents()
            .times(1)
            .returning(|_| {
                Ok(vec![
                    link(1, "a", "https://a.com", 7),
                    link(2, "b", "https://b.com", 7),
                ])
            });

        let idents = vec!["a".to_string(), "b".to_string()];
        assert!(service(mock_repo).authorize_delete(7, &idents).await.unwrap());
    }

    #[tokio::test]
    async fn test_authorize_delete_foreign_link() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_get_links_by_idents()
            .times(1)
            .returning(|_| {
                Ok(vec![
                    link(1, "a", "https://a.com", 7),
                    link(2, "b", "https://b.com", 8),
                ])
            });

        let idents = vec!["a".to_string(), "b".to_string()];
        assert!(!service(mock_repo).authorize_delete(7, &idents).await.unwrap());
    }

    #[tokio::test]
    async fn test_authorize_delete_unknown_idents_pass() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_get_links_by_idents()
            .times(1)
            .returning(|_| Ok(vec![link(1, "a", "https://a.com", 7)]));

        let idents = vec!["a".to_string(), "typo".to_string()];
        assert!(service(mock_repo).authorize_delete(7, &idents).await.unwrap());
    }

    #[test]
    fn test_short_url_trims_trailing_slash() {
        let service = service(MockLinkRepository::new());
        assert_eq!(service.short_url("abc"), "http://localhost:8080/abc");
    }
}
