use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::SharedContext;
use crate::utils::health::HealthStatus;

/// GET /health -- 200 when healthy, 503 otherwise.
pub async fn health(State(ctx): State<SharedContext>) -> (StatusCode, Json<HealthStatus>) {
    let status = ctx.health_check();
    let code = if status.is_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(status))
}
