use axum::Json;

use crate::response::ApiResponse;

/// GET /api/health
///
/// Public liveness probe.
pub async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::success((), "Service is healthy"))
}
