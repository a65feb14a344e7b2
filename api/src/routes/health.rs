use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::response::ApiResponse;
use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// GET `/api/health`
///
/// `200` with `"data": "OK"` while the database answers, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<String>>) {
    match state.db().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success("OK".to_string(), "Health check passed")),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error("Database unavailable")),
            )
        }
    }
}
