//! HTTP middleware for request processing.
//!
//! Provides session identity and access logging.

pub mod session;
pub mod tracing;
