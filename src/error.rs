//! Application error type and its HTTP mapping.
//!
//! Every fallible operation in the service, handler and middleware layers
//! returns [`AppError`]. Storage backends report [`StorageError`] and session
//! tokens report [`TokenError`]; both convert into [`AppError`] with `?`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::entities::Link;

/// JSON envelope returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorInfo,
}

/// Machine-readable error code, human message and optional details.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed input: bad JSON, wrong content type, invalid URL.
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// No usable identity for an owner-scoped operation.
    #[error("{message}")]
    Unauthorized { message: String, details: Value },

    /// Identity present but not allowed to touch the requested links.
    #[error("{message}")]
    Forbidden { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    /// The link exists but has been soft-deleted.
    #[error("{message}")]
    Gone { message: String, details: Value },

    /// The URL is already shortened.
    #[error("{message}")]
    Conflict { message: String, details: Value },

    /// A background component no longer accepts work (shutdown in progress).
    #[error("{message}")]
    Unavailable { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>, details: Value) -> Self {
        Self::Unauthorized {
            message: message.into(),
            details,
        }
    }

    pub fn forbidden(message: impl Into<String>, details: Value) -> Self {
        Self::Forbidden {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn gone(message: impl Into<String>, details: Value) -> Self {
        Self::Gone {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }

    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::Unavailable {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Gone { .. } => StatusCode::GONE,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converts the error into its serializable body.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (code, message, details) = match self {
            AppError::Validation { message, details } => ("validation_error", message, details),
            AppError::Unauthorized { message, details } => ("unauthorized", message, details),
            AppError::Forbidden { message, details } => ("forbidden", message, details),
            AppError::NotFound { message, details } => ("not_found", message, details),
            AppError::Gone { message, details } => ("gone", message, details),
            AppError::Conflict { message, details } => ("conflict", message, details),
            AppError::Unavailable { message, details } => ("unavailable", message, details),
            AppError::Internal { message, details } => ("internal_error", message, details),
        };

        ErrorInfo {
            code,
            message: message.clone(),
            details: details.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::bad_request("Validation failed", json!(errors))
    }
}

/// Errors reported by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The URL already has an active link; `existing` is that link.
    #[error("url already shortened as {}", existing.ident)]
    Conflict { existing: Link },

    /// A batch contains the same URL more than once.
    #[error("url repeated within batch: {0}")]
    DuplicateUrl(String),

    /// The generated ident is already in use.
    #[error("ident already taken: {0}")]
    IdentTaken(String),

    #[error("link not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { existing } => AppError::conflict(
                "URL already shortened",
                json!({ "ident": existing.ident }),
            ),
            StorageError::DuplicateUrl(url) => {
                AppError::conflict("URL repeated within batch", json!({ "url": url }))
            }
            StorageError::NotFound(ident) => {
                AppError::not_found("Short link not found", json!({ "ident": ident }))
            }
            StorageError::IdentTaken(_) => AppError::internal(
                "Failed to generate unique ident",
                json!({ "reason": "Too many collisions" }),
            ),
            other => {
                tracing::error!(error = %other, "Storage failure");
                AppError::internal("Storage error", json!({}))
            }
        }
    }
}

/// Errors reported while issuing or parsing session tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not structurally a signed token.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signing key could not be used.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(reason) => {
                AppError::bad_request("Malformed session token", json!({ "reason": reason }))
            }
            TokenError::Signing(reason) => {
                tracing::error!(reason = %reason, "Session token signing failed");
                AppError::internal("Failed to issue session token", json!({}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::bad_request("x", json!({})).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::forbidden("x", json!({})).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::gone("x", json!({})).status(), StatusCode::GONE);
        assert_eq!(
            AppError::unavailable("x", json!({})).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_storage_conflict_carries_existing_ident() {
        let existing = Link::new(1, "abc".to_string(), "https://a.com".to_string(), 7, false);
        let err: AppError = StorageError::Conflict { existing }.into();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(err.to_error_info().details["ident"], "abc");
    }

    #[test]
    fn test_storage_io_maps_to_internal() {
        let err: AppError = StorageError::Io(std::io::Error::other("disk full")).into();
        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[test]
    fn test_error_message_display() {
        let err = AppError::not_found("Short link not found", json!({}));
        assert_eq!(err.to_string(), "Short link not found");
        assert_eq!(err.to_error_info().code, "not_found");
    }
}
