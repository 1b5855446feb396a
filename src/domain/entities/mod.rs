//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures without business logic. Creation input
//! is modelled separately from stored records:
//!
//! - [`Link`] - A stored short link mapping, possibly soft-deleted
//! - [`NewLink`] - An ident/URL pair awaiting insertion in a batch

pub mod link;

pub use link::{Link, NewLink};
