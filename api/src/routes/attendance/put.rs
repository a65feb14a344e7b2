use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use services::{AttendanceCodeService, IssueError};

use super::common::{AttendanceCodeResponse, IdQuery, SetActiveReq};
use crate::response::ApiResponse;
use crate::routes::common::format_json_rejection;
use crate::state::AppState;

/// PUT `/api/attendance/codes?id=<id>`
///
/// Activate or deactivate a code. Setting the state it already has is a success.
///
/// **Auth**: staff
///
/// **Body**: `{ "is_active": false }`
///
/// **Responses**: `200 OK` with the updated code, `400` for a missing id or body, `404`.
pub async fn set_code_active(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Result<Json<SetActiveReq>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<AttendanceCodeResponse>>) {
    let Some(id) = query.id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("id is required")),
        );
    };
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format_json_rejection(&rejection))),
            );
        }
    };

    match AttendanceCodeService::set_active(state.db(), id, req.is_active).await {
        Ok(code) => {
            let message = if code.is_active {
                "Attendance code activated"
            } else {
                "Attendance code deactivated"
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    AttendanceCodeResponse::from_model(code, Utc::now()),
                    message,
                )),
            )
        }
        Err(IssueError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Attendance code not found")),
        ),
        Err(e) => {
            tracing::error!(error = %e, id, "Failed to update attendance code");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to update attendance code")),
            )
        }
    }
}
