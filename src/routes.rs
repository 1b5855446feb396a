//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /`        - Shorten a URL sent as plain text
//! - `GET  /{ident}` - Short link redirect
//! - `GET  /ping`    - Storage liveness
//! - `GET  /health`  - Component health report
//! - `/api/*`        - JSON API
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Session** - Identity from the `token` cookie on every route

use crate::api;
use crate::api::handlers::{health_handler, ping_handler, redirect_handler, shorten_plain_handler};
use crate::api::middleware::{session, tracing};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Router, middleware};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(shorten_plain_handler))
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/{ident}", get(redirect_handler))
        .nest("/api", api::routes::api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), session::layer))
        .with_state(state)
        .layer(tracing::layer())
}
