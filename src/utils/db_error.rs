//! Classification of PostgreSQL unique violations.

/// Unique constraint on `links.ident`.
pub const IDENT_CONSTRAINT: &str = "links_ident_key";

/// Partial unique index on `links.full_url` for active links.
pub const ACTIVE_URL_CONSTRAINT: &str = "links_full_url_active_key";

/// Which uniqueness rule an insert violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueViolation {
    Ident,
    ActiveUrl,
}

/// Returns the violated uniqueness rule, if the error is a unique violation on `links`.
pub fn unique_violation(e: &sqlx::Error) -> Option<UniqueViolation> {
    let db_err = e.as_database_error()?;

    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.constraint() {
        Some(IDENT_CONSTRAINT) => Some(UniqueViolation::Ident),
        Some(ACTIVE_URL_CONSTRAINT) => Some(UniqueViolation::ActiveUrl),
        _ => None,
    }
}
