//! DTOs for link shortening endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request body of `POST /api/shorten`.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL to shorten (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
}

/// Response body of `POST /api/shorten`, for both new and existing links.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

/// One element of the `POST /api/shorten/batch` request array.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchItemRequest {
    /// Opaque client token echoed back in the response.
    pub correlation_id: String,

    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,
}

/// One element of the `POST /api/shorten/batch` response array.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchItemResponse {
    pub correlation_id: String,
    pub short_url: String,
}
