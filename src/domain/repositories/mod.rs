//! Repository trait definitions for the domain layer.
//!
//! These traits are the storage port: services and the deletion worker depend
//! only on them, never on a concrete backend.
//!
//! # Implementations
//!
//! - [`crate::infrastructure::memory::FileStorage`] - in-memory maps with an
//!   optional append-only JSON Lines file
//! - [`crate::infrastructure::persistence`] - PostgreSQL via SQLx
//!
//! Mock implementations are auto-generated via `mockall` for unit tests.

pub mod link_repository;
pub mod user_repository;

pub use link_repository::LinkRepository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
