//! Utility functions for ident generation, URL checks, and request handling.
//!
//! - [`ident_generator`] - Short ident generation
//! - [`url_check`] - Validation of URLs submitted for shortening
//! - [`content_type`] - Content-Type guard for raw request bodies
//! - [`db_error`] - Classification of PostgreSQL constraint violations

pub mod content_type;
pub mod db_error;
pub mod ident_generator;
pub mod url_check;
