use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use services::{AttendanceCodeService, IssueError};

use super::common::IdQuery;
use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::state::AppState;

/// DELETE `/api/attendance/codes?id=<id>`
///
/// Deletes a code. Attendance recorded with it stays.
///
/// **Auth**: staff
///
/// **Responses**: `200 OK`, `400` without an id, `404` for an unknown id.
pub async fn delete_code(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    let Some(id) = query.id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("id is required")),
        );
    };

    match AttendanceCodeService::delete(state.db(), id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Attendance code deleted")),
        ),
        Err(IssueError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance code not found")),
        ),
        Err(e) => {
            tracing::error!(error = %e, id, "Failed to delete attendance code");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to delete attendance code")),
            )
        }
    }
}
