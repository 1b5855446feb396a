//! Content-Type guard for handlers that read raw request bodies.

use axum::http::{HeaderMap, header};
use serde_json::json;

use crate::error::AppError;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_X_GZIP: &str = "application/x-gzip";

/// Checks that the request media type (parameters ignored) is one of `allowed`.
///
/// # Errors
///
/// Returns [`AppError::Validation`] when the header is missing, not valid
/// UTF-8, or names a media type outside `allowed`.
pub fn require_content_type(headers: &HeaderMap, allowed: &[&str]) -> Result<(), AppError> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if allowed.contains(&media_type.as_str()) {
        Ok(())
    } else {
        Err(AppError::bad_request(
            "Invalid Content-Type",
            json!({ "content_type": media_type, "allowed": allowed }),
        ))
    }
}
