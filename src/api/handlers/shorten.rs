//! Handlers for link shortening endpoints.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::{
    BatchItemRequest, BatchItemResponse, ShortenRequest, ShortenResponse,
};
use crate::api::middleware::session::Session;
use crate::application::services::link_service::{BatchEntry, check_url};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::content_type::{APPLICATION_X_GZIP, TEXT_PLAIN, require_content_type};

/// Maps a JSON extractor rejection to a `400` in the service error format.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        AppError::bad_request(
            "Invalid JSON body",
            json!({ "reason": rejection.body_text() }),
        )
    })
}

fn created_or_conflict(conflict: bool) -> StatusCode {
    if conflict {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// Shortens a URL sent as the raw request body.
///
/// # Endpoint
///
/// `POST /`
///
/// # Request
///
/// ```text
/// Content-Type: text/plain
///
/// https://example.com/some/long/path
/// ```
///
/// # Response
///
/// `201 Created` with the short URL as `text/plain`. If the URL was already
/// shortened, `409 Conflict` with the existing short URL.
///
/// # Errors
///
/// Returns 400 Bad Request for a wrong content type or an invalid URL.
pub async fn shorten_plain_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, AppError> {
    require_content_type(&headers, &[TEXT_PLAIN, APPLICATION_X_GZIP])?;

    let url = body.trim();
    if url.is_empty() {
        return Err(AppError::bad_request("Request body is empty", json!({})));
    }
    check_url(url)?;

    let user_id = session.user_id_or_create(&state.auth_service).await?;
    let shortened = state.link_service.shorten(url, user_id).await?;

    Ok((
        created_or_conflict(shortened.conflict),
        [(header::CONTENT_TYPE, TEXT_PLAIN)],
        state.link_service.short_url(&shortened.ident),
    )
        .into_response())
}

/// Shortens a URL sent as JSON.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com" }
/// ```
///
/// # Response
///
/// ```json
/// { "result": "http://localhost:8080/Ab3dE_9xYz1Q" }
/// ```
///
/// `201 Created` for a new link, `409 Conflict` with the same body shape for
/// an already shortened URL.
///
/// # Errors
///
/// Returns 400 Bad Request for malformed JSON or an invalid URL.
pub async fn shorten_json_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = json_body(payload)?;
    payload.validate()?;

    let user_id = session.user_id_or_create(&state.auth_service).await?;
    let shortened = state.link_service.shorten(&payload.url, user_id).await?;

    Ok((
        created_or_conflict(shortened.conflict),
        Json(ShortenResponse {
            result: state.link_service.short_url(&shortened.ident),
        }),
    )
        .into_response())
}

/// Shortens several URLs in one all-or-nothing operation.
///
/// # Endpoint
///
/// `POST /api/shorten/batch`
///
/// # Request Body
///
/// ```json
/// [
///   { "correlation_id": "1", "original_url": "https://a.example" },
///   { "correlation_id": "2", "original_url": "https://b.example" }
/// ]
/// ```
///
/// # Response
///
/// `201 Created` with one `{correlation_id, short_url}` per input, in order.
///
/// # Errors
///
/// - 400 Bad Request for malformed JSON, an empty array or an invalid URL
/// - 409 Conflict if any URL is already shortened or repeated; nothing is stored
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<Vec<BatchItemRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<BatchItemResponse>>), AppError> {
    let items = json_body(payload)?;
    if items.is_empty() {
        return Err(AppError::bad_request("Batch is empty", json!({})));
    }
    for item in &items {
        item.validate()?;
    }

    let user_id = session.user_id_or_create(&state.auth_service).await?;

    let entries = items
        .into_iter()
        .map(|item| BatchEntry {
            correlation_id: item.correlation_id,
            url: item.original_url,
        })
        .collect();

    let results = state.link_service.shorten_batch(entries, user_id).await?;

    let response = results
        .into_iter()
        .map(|result| BatchItemResponse {
            short_url: state.link_service.short_url(&result.ident),
            correlation_id: result.correlation_id,
        })
        .collect();

    Ok((StatusCode::CREATED, Json(response)))
}
