//! Application layer services implementing business logic.
//!
//! Services consume repository traits and provide a clean API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Short link creation, lookup and ownership checks
//! - [`services::auth_service::AuthService`] - User identities and signed session tokens

pub mod services;
