//! Handlers for the caller's own links.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::user_links::UserLinkResponse;
use crate::api::handlers::shorten::json_body;
use crate::api::middleware::session::Session;
use crate::error::AppError;
use crate::state::AppState;

/// Lists the caller's active links.
///
/// # Endpoint
///
/// `GET /api/user/urls`
///
/// # Response
///
/// ```json
/// [
///   { "short_url": "http://localhost:8080/Ab3dE_9xYz1Q", "original_url": "https://example.com" }
/// ]
/// ```
///
/// `204 No Content` when the caller has no links.
///
/// # Errors
///
/// Returns 401 Unauthorized without a valid session cookie.
pub async fn list_user_links_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response, AppError> {
    let user_id = session.require_user_id()?;

    let links = state.link_service.list_by_user(user_id).await?;
    if links.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<UserLinkResponse> = links
        .into_iter()
        .map(|link| UserLinkResponse {
            short_url: state.link_service.short_url(&link.ident),
            original_url: link.full_url,
        })
        .collect();

    Ok(Json(body).into_response())
}

/// Schedules the caller's links for deletion.
///
/// # Endpoint
///
/// `DELETE /api/user/urls`
///
/// # Request Body
///
/// ```json
/// ["Ab3dE_9xYz1Q", "Zx8_mN2pQr4T"]
/// ```
///
/// # Response
///
/// `202 Accepted` once ownership is verified. The links are marked deleted
/// by the next background flush.
///
/// # Errors
///
/// - 400 Bad Request for malformed JSON or an empty array
/// - 401 Unauthorized without a valid session cookie
/// - 403 Forbidden if any existing link belongs to another user
/// - 503 Service Unavailable while shutting down
pub async fn delete_user_links_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let user_id = session.require_user_id()?;

    let idents = json_body(payload)?;
    if idents.is_empty() {
        return Err(AppError::bad_request("No idents supplied", json!({})));
    }

    if !state.link_service.authorize_delete(user_id, &idents).await? {
        tracing::info!(user_id, "Rejected deletion of links owned by others");
        return Err(AppError::forbidden(
            "Forbidden",
            json!({ "reason": "Some links belong to another user" }),
        ));
    }

    state.deletion.enqueue(idents).await?;

    Ok(StatusCode::ACCEPTED)
}
