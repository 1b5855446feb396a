//! Handlers for liveness and health endpoints.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Reports whether the storage backend is reachable.
///
/// # Endpoint
///
/// `GET /ping`
///
/// # Errors
///
/// Returns 500 Internal Server Error if storage does not answer.
pub async fn ping_handler(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.link_service.ping().await?;
    Ok(StatusCode::OK)
}

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "storage": { "status": "ok", "message": "Reachable" },
///     "deletion_queue": { "status": "ok", "message": "Pending: 0" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = check_storage(&state).await;
    let deletion_queue = check_deletion_queue(&state);

    let all_healthy = storage.is_ok() && deletion_queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage,
            deletion_queue,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_storage(state: &AppState) -> CheckStatus {
    match state.link_service.ping().await {
        Ok(()) => CheckStatus::ok("Reachable"),
        Err(e) => CheckStatus::error(format!("Storage error: {}", e)),
    }
}

fn check_deletion_queue(state: &AppState) -> CheckStatus {
    let pending = state.deletion.pending_len();
    if state.deletion.is_running() {
        CheckStatus::ok(format!("Pending: {}", pending))
    } else {
        CheckStatus::error(format!("Deletion queue is closed, pending: {}", pending))
    }
}
