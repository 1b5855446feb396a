//! API route configuration.
//!
//! Every route runs behind [`crate::api::middleware::session`], so handlers
//! can read or create the caller's identity.

use crate::api::handlers::{
    delete_user_links_handler, list_user_links_handler, shorten_batch_handler,
    shorten_json_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// JSON API routes, nested under `/api`.
///
/// # Endpoints
///
/// - `POST   /shorten`        - Shorten one URL
/// - `POST   /shorten/batch`  - Shorten several URLs atomically
/// - `GET    /user/urls`      - List the caller's links
/// - `DELETE /user/urls`      - Schedule the caller's links for deletion
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_json_handler))
        .route("/shorten/batch", post(shorten_batch_handler))
        .route(
            "/user/urls",
            get(list_user_links_handler).delete(delete_user_links_handler),
        )
}
