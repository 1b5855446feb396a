//! In-memory link and user storage with optional append-only file persistence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::{LinkRepository, UserRepository};
use crate::error::StorageError;

/// One line of the storage file.
///
/// A later `link` entry for the same ident replaces the earlier one, which is
/// how soft-deletion is persisted. Commits touching several records are
/// written as one `batch` line so a torn write never keeps half of them.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Entry {
    Link(Link),
    User { user_id: i64 },
    Batch { entries: Vec<Entry> },
}

#[derive(Default)]
struct Inner {
    links: HashMap<String, Link>,
    /// `full_url` to ident, for non-deleted links only.
    active_urls: HashMap<String, String>,
    last_link_id: i64,
    last_user_id: i64,
    file: Option<File>,
}

impl Inner {
    fn apply(&mut self, entry: Entry) {
        match entry {
            Entry::Link(link) => {
                if let Some(previous) = self.links.get(&link.ident)
                    && self.active_urls.get(&previous.full_url) == Some(&previous.ident)
                {
                    self.active_urls.remove(&previous.full_url);
                }

                if !link.is_deleted {
                    self.active_urls
                        .insert(link.full_url.clone(), link.ident.clone());
                }
                self.last_link_id = self.last_link_id.max(link.id);
                self.last_user_id = self.last_user_id.max(link.user_id);
                self.links.insert(link.ident.clone(), link);
            }
            Entry::User { user_id } => {
                self.last_user_id = self.last_user_id.max(user_id);
            }
            Entry::Batch { entries } => {
                for entry in entries {
                    self.apply(entry);
                }
            }
        }
    }

    fn active_link(&self, full_url: &str) -> Option<&Link> {
        self.active_urls
            .get(full_url)
            .and_then(|ident| self.links.get(ident))
    }

    /// Appends `entries` to the file as a single line, then applies them.
    ///
    /// Nothing is applied if the write fails, and the file is cut back to its
    /// previous length so the next append starts on a clean line.
    async fn commit(&mut self, mut entries: Vec<Entry>) -> Result<(), StorageError> {
        let entry = match entries.len() {
            0 => return Ok(()),
            1 => entries.remove(0),
            _ => Entry::Batch { entries },
        };

        if let Some(file) = self.file.as_mut() {
            let mut buf = serde_json::to_vec(&entry)?;
            buf.push(b'\n');

            let len = file.metadata().await?.len();
            if let Err(e) = append(file, &buf).await {
                if let Err(rollback) = file.set_len(len).await {
                    tracing::error!(error = %rollback, "Failed to roll back partial append");
                }
                return Err(e.into());
            }
        }

        self.apply(entry);
        Ok(())
    }
}

async fn append(file: &mut File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf).await?;
    file.flush().await
}

/// Link and user storage kept in memory.
///
/// When opened with a path, every change is appended to that file as a JSON
/// line and the file is replayed on the next start. All state sits behind a
/// single async mutex, so operations are serialized.
pub struct FileStorage {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl FileStorage {
    /// Creates an empty store that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            path: None,
        }
    }

    /// Opens the store at `path`, replaying existing entries.
    ///
    /// An empty path yields a memory-only store. A missing file is created.
    /// A torn last line, left by a crash during an append, is cut off with a
    /// warning; the entries before it are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read or opened and
    /// [`StorageError::Serialization`] if a line before the last one is not
    /// a valid entry.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(Self::in_memory());
        }

        let mut inner = Inner::default();

        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut replayed = 0usize;
        let mut valid_len = 0usize;
        let mut corrupt: Option<(usize, serde_json::Error)> = None;

        for (line_no, raw) in contents.split_inclusive(|&b| b == b'\n').enumerate() {
            if raw.trim_ascii().is_empty() {
                if corrupt.is_none() {
                    valid_len += raw.len();
                }
                continue;
            }
            if let Some((line, e)) = corrupt.take() {
                tracing::error!(
                    path = %path.display(),
                    line,
                    error = %e,
                    "Corrupt storage entry"
                );
                return Err(e.into());
            }
            // Only the last segment can lack a newline: an interrupted append.
            if !raw.ends_with(b"\n") {
                break;
            }

            match serde_json::from_slice::<Entry>(raw) {
                Ok(entry) => {
                    inner.apply(entry);
                    replayed += 1;
                    valid_len += raw.len();
                }
                Err(e) => corrupt = Some((line_no + 1, e)),
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        if valid_len < contents.len() {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = contents.len() - valid_len,
                "Truncating torn tail of storage file"
            );
            file.set_len(valid_len as u64).await?;
        }
        inner.file = Some(file);

        tracing::info!(
            path = %path.display(),
            entries = replayed,
            links = inner.links.len(),
            "File storage loaded"
        );

        Ok(Self {
            inner: Mutex::new(inner),
            path: Some(path.to_path_buf()),
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl LinkRepository for FileStorage {
    async fn create_link(
        &self,
        ident: &str,
        full_url: &str,
        user_id: i64,
    ) -> Result<Link, StorageError> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.active_link(full_url) {
            return Err(StorageError::Conflict {
                existing: existing.clone(),
            });
        }
        if inner.links.contains_key(ident) {
            return Err(StorageError::IdentTaken(ident.to_string()));
        }

        let link = Link::new(
            inner.last_link_id + 1,
            ident.to_string(),
            full_url.to_string(),
            user_id,
            false,
        );
        inner.commit(vec![Entry::Link(link.clone())]).await?;

        Ok(link)
    }

    async fn create_links(&self, links: Vec<NewLink>, user_id: i64) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;

        let mut urls = HashSet::with_capacity(links.len());
        let mut idents = HashSet::with_capacity(links.len());
        for link in &links {
            if let Some(existing) = inner.active_link(&link.full_url) {
                return Err(StorageError::Conflict {
                    existing: existing.clone(),
                });
            }
            if !urls.insert(link.full_url.as_str()) {
                return Err(StorageError::DuplicateUrl(link.full_url.clone()));
            }
            if inner.links.contains_key(&link.ident) || !idents.insert(link.ident.as_str()) {
                return Err(StorageError::IdentTaken(link.ident.clone()));
            }
        }

        let first_id = inner.last_link_id + 1;
        let entries = links
            .into_iter()
            .zip(first_id..)
            .map(|(link, id)| Entry::Link(Link::new(id, link.ident, link.full_url, user_id, false)))
            .collect();

        inner.commit(entries).await
    }

    async fn get_link_by_ident(&self, ident: &str) -> Result<Link, StorageError> {
        self.inner
            .lock()
            .await
            .links
            .get(ident)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(ident.to_string()))
    }

    async fn get_links_by_idents(&self, idents: &[String]) -> Result<Vec<Link>, StorageError> {
        let inner = self.inner.lock().await;

        Ok(idents
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|ident| inner.links.get(ident).cloned())
            .collect())
    }

    async fn list_links_by_user(&self, user_id: i64) -> Result<Vec<Link>, StorageError> {
        let inner = self.inner.lock().await;

        let mut links: Vec<Link> = inner
            .links
            .values()
            .filter(|link| link.user_id == user_id && !link.is_deleted)
            .cloned()
            .collect();
        links.sort_by_key(|link| link.id);

        Ok(links)
    }

    async fn mark_deleted(&self, idents: &[String]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;

        let entries: Vec<Entry> = idents
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|ident| inner.links.get(ident))
            .filter(|link| !link.is_deleted)
            .map(|link| {
                Entry::Link(Link {
                    is_deleted: true,
                    ..link.clone()
                })
            })
            .collect();

        if entries.is_empty() {
            return Ok(());
        }

        let count = entries.len();
        inner.commit(entries).await?;
        tracing::debug!(updated = count, "Marked links deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        if let Some(file) = inner.file.as_mut() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for FileStorage {
    async fn create_user(&self) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;

        let user_id = inner.last_user_id + 1;
        inner.commit(vec![Entry::User { user_id }]).await?;

        Ok(user_id)
    }
}
