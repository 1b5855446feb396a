//! DTOs for the per-user link endpoints.

use serde::{Deserialize, Serialize};

/// One link owned by the caller, as listed by `GET /api/user/urls`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserLinkResponse {
    pub short_url: String,
    pub original_url: String,
}
