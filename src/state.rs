//! Shared application state injected into handlers and middleware.

use std::sync::Arc;

use crate::application::services::{AuthService, LinkService};
use crate::domain::deletion_worker::DeletionCoordinator;
use crate::domain::repositories::{LinkRepository, UserRepository};

/// Services shared by every request.
///
/// Cloning is cheap: every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService<dyn LinkRepository>>,
    pub auth_service: Arc<AuthService<dyn UserRepository>>,
    pub deletion: Arc<DeletionCoordinator>,
}

impl AppState {
    pub fn new(
        link_service: Arc<LinkService<dyn LinkRepository>>,
        auth_service: Arc<AuthService<dyn UserRepository>>,
        deletion: Arc<DeletionCoordinator>,
    ) -> Self {
        Self {
            link_service,
            auth_service,
            deletion,
        }
    }
}
