//! Infrastructure layer for external integrations.
//!
//! This layer implements the storage traits defined by the domain layer.
//!
//! # Modules
//!
//! - [`memory`] - In-memory storage with optional JSON Lines file persistence
//! - [`persistence`] - PostgreSQL repository implementations

pub mod memory;
pub mod persistence;
