//! Link entity representing a shortened URL mapping.

use serde::{Deserialize, Serialize};

/// A shortened URL owned by a user.
///
/// Links are never physically removed: deletion only sets `is_deleted`, so an
/// ident is never handed out twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Storage-assigned sequence, used for ordering only.
    pub id: i64,
    pub ident: String,
    pub full_url: String,
    pub user_id: i64,
    pub is_deleted: bool,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(id: i64, ident: String, full_url: String, user_id: i64, is_deleted: bool) -> Self {
        Self {
            id,
            ident,
            full_url,
            user_id,
            is_deleted,
        }
    }

    /// Returns true if the link belongs to `user_id`.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

/// Input data for one entry of a bulk insert.
///
/// The owner is supplied once for the whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub ident: String,
    pub full_url: String,
}

impl NewLink {
    pub fn new(ident: impl Into<String>, full_url: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            full_url: full_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_creation() {
        let link = Link::new(
            1,
            "abc123".to_string(),
            "https://example.com".to_string(),
            42,
            false,
        );

        assert_eq!(link.id, 1);
        assert_eq!(link.ident, "abc123");
        assert_eq!(link.full_url, "https://example.com");
        assert_eq!(link.user_id, 42);
        assert!(!link.is_deleted);
    }

    #[test]
    fn test_link_ownership() {
        let link = Link::new(1, "code".to_string(), "https://a.com".to_string(), 5, false);

        assert!(link.is_owned_by(5));
        assert!(!link.is_owned_by(6));
    }

    #[test]
    fn test_link_json_roundtrip_keeps_deleted_flag() {
        let link = Link::new(3, "del".to_string(), "https://b.com".to_string(), 1, true);

        let encoded = serde_json::to_string(&link).unwrap();
        let decoded: Link = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, link);
        assert!(decoded.is_deleted);
    }

    #[test]
    fn test_new_link_creation() {
        let new_link = NewLink::new("xyz789", "https://rust-lang.org");

        assert_eq!(new_link.ident, "xyz789");
        assert_eq!(new_link.full_url, "https://rust-lang.org");
    }
}
