//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short ident to its original URL.
///
/// # Endpoint
///
/// `GET /{ident}`
///
/// No identity is needed and none is created.
///
/// # Errors
///
/// - 404 Not Found if the ident doesn't exist
/// - 410 Gone if the link has been deleted
/// - 500 Internal Server Error if the stored URL is not a valid header value
pub async fn redirect_handler(
    Path(ident): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let link = state.link_service.resolve(&ident).await?;

    if link.is_deleted {
        return Err(AppError::gone(
            "Short link has been deleted",
            json!({ "ident": link.ident }),
        ));
    }

    let location = HeaderValue::from_str(&link.full_url).map_err(|_| {
        AppError::internal(
            "Stored URL cannot be used as a redirect target",
            json!({ "ident": link.ident }),
        )
    })?;

    Ok((StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response())
}
