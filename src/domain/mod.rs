//! Domain layer: entities, storage ports and the deletion coordinator.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Storage traits implemented by the infrastructure layer
//! - [`deletion_worker`] - Batched background soft-deletion
//!
//! # Deletion Flow
//!
//! 1. `DELETE /api/user/urls` verifies ownership through the link service
//! 2. The idents are queued with [`deletion_worker::DeletionCoordinator::enqueue`]
//! 3. The worker unions queued batches and flushes them on every tick
//! 4. Records are marked deleted via [`repositories::LinkRepository::mark_deleted`]

pub mod deletion_worker;
pub mod entities;
pub mod repositories;
