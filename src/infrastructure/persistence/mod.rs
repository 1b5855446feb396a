//! PostgreSQL repository implementations.
//!
//! Concrete implementations of the domain repository traits using SQLx.
//! The schema lives in `migrations/` and is applied at startup.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage, lookup and soft-deletion
//! - [`PgUserRepository`] - User id allocation

pub mod pg_link_repository;
pub mod pg_user_repository;
pub mod postgres;

pub use pg_link_repository::PgLinkRepository;
pub use pg_user_repository::PgUserRepository;
pub use postgres::connect;
