//! Memory-resident storage, optionally persisted to a local file.

pub mod file_storage;

pub use file_storage::FileStorage;
