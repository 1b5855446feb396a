//! Short ident generation.
//!
//! Idents are derived from the submitted URL mixed with fresh entropy, so the
//! same URL gets a different ident on every call. Uniqueness is the storage
//! layer's job: a collision surfaces as
//! [`crate::error::StorageError::IdentTaken`] and the caller retries.

use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of digest bytes kept before base64 encoding (12 output characters).
const IDENT_LENGTH_BYTES: usize = 9;

/// Bytes of OS entropy mixed into each ident.
const SALT_LENGTH_BYTES: usize = 16;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generates a 12-character URL-safe ident for `seed`.
///
/// Hashes the seed together with OS randomness, a process-wide counter and the
/// current time, then encodes the first 9 digest bytes as URL-safe base64
/// without padding. Any string, including the empty one, is a valid seed.
///
/// If the OS random source is unavailable the counter and clock still keep
/// idents from the same process distinct.
///
/// # Examples
///
/// ```ignore
/// let ident = generate_ident("https://example.com");
/// assert_eq!(ident.len(), 12);
/// assert!(ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
/// ```
pub fn generate_ident(seed: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH_BYTES];
    if let Err(e) = getrandom::fill(&mut salt) {
        tracing::warn!(error = %e, "OS random source unavailable, using counter only");
    }

    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(salt);
    hasher.update(sequence.to_le_bytes());
    hasher.update(nanos.to_le_bytes());
    let digest = hasher.finalize();

    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&digest[..IDENT_LENGTH_BYTES])
}
