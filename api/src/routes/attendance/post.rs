use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use db::models::attendance_record::CheckInMethod;
use services::{
    AttendanceCodeService, CheckInError, CheckInRequest, CreateAttendanceCode, ErrorKind,
    IssueError,
};
use validator::Validate;

use super::common::{AttendanceCodeResponse, AttendanceView, CheckInReq, CheckInResponse, CreateCodeReq};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{format_json_rejection, format_validation_errors};
use crate::state::AppState;

/// POST `/api/attendance/codes`
///
/// Issue a new attendance code.
///
/// **Auth**: staff
///
/// **Body**
/// ```json
/// {
///   "location": "Main Dojo",
///   "class_id": 12,
///   "valid_from": "2026-10-19T17:00:00Z",
///   "valid_until": "2026-10-19T20:00:00Z"
/// }
/// ```
/// Instead of `valid_until`, either `"duration": "day" | "week" | "month" | "year"` or
/// `"duration_days": n` may be given. With no window at all the code never expires.
///
/// **Responses**
/// - `201 Created` with the code in `data`
/// - `400 Bad Request` missing location, bad window, or unknown `class_id`
/// - `401 Unauthorized` the token's subject has no user record
/// - `500 Internal Server Error`
pub async fn issue_code(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    body: Result<Json<CreateCodeReq>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse<AttendanceCodeResponse>>) {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format_json_rejection(&rejection))),
            );
        }
    };

    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&e))),
        );
    }

    let now = Utc::now();
    let params = CreateAttendanceCode {
        issuer_id: claims.sub,
        location: req.location,
        class_id: req.class_id,
        valid_from: req.valid_from,
        valid_until: req.valid_until,
        duration: req.duration,
        duration_days: req.duration_days,
    };

    match AttendanceCodeService::issue(state.db(), state.code_pattern(), params, now).await {
        Ok(code) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                AttendanceCodeResponse::from_model(code, now),
                "Attendance code created",
            )),
        ),
        Err(IssueError::UnknownIssuer(_)) => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Please sign in again")),
        ),
        Err(e @ (IssueError::Validation(_) | IssueError::ClassNotFound(_))) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(e.to_string())),
        ),
        Err(e) => {
            tracing::error!(error = %e, issuer_id = claims.sub, "Failed to issue attendance code");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to create attendance code")),
            )
        }
    }
}

/// POST `/api/attendance/check-in`
///
/// Check the caller in with a scanned or typed code.
///
/// **Auth**: any authenticated user; the student is always the token's subject.
///
/// **Body**
/// ```json
/// { "qr_code": "HAMARR-AB12CD", "timestamp": "2026-10-19T18:05:00Z", "check_in_method": "qr" }
/// ```
/// `qr_code` may also be a check-in link carrying the code.
///
/// **Response** (not wrapped in `ApiResponse`)
/// ```json
/// {
///   "success": true,
///   "message": "Checked in to Evening Karate",
///   "already_checked_in": false,
///   "attendance": {
///     "id": 7, "class_id": 12, "class_name": "Evening Karate", "class_date": "2026-10-19",
///     "class_time": "18:00", "discipline": "Karate", "location": "Main Dojo",
///     "attended": true, "check_in_time": "2026-10-19T18:05:00+00:00", "check_in_method": "qr"
///   }
/// }
/// ```
/// Failures set `success: false` and `error` to one of `invalid_format` (400),
/// `code_not_found` (404), `code_expired_or_inactive` (410), `class_resolution_failed` (422),
/// `unauthorized` (401) or `transient` (503).
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<CheckInReq>, JsonRejection>,
) -> (StatusCode, Json<CheckInResponse>) {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CheckInResponse::rejected(
                    ErrorKind::InvalidFormat,
                    format_json_rejection(&rejection),
                )),
            );
        }
    };

    let client_time = req.timestamp.as_deref().and_then(|raw| {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| t.with_timezone(&Utc))
            .inspect_err(|e| tracing::debug!(timestamp = raw, error = %e, "Ignoring unparsable check-in timestamp"))
            .ok()
    });

    let request = CheckInRequest {
        student_id: user.user_id(),
        raw_code: req.qr_code,
        client_time,
        method: req.check_in_method.unwrap_or(CheckInMethod::Qr),
    };

    match state.check_in().check_in(state.db(), request, Utc::now()).await {
        Ok(outcome) => {
            let view = AttendanceView::new(&outcome.record, &outcome.class);
            (
                StatusCode::OK,
                Json(CheckInResponse::checked_in(view, outcome.already_checked_in)),
            )
        }
        Err(e) => {
            if let CheckInError::Transient(db_err) = &e {
                tracing::error!(error = %db_err, student_id = user.user_id(), "Check-in failed on storage");
            } else {
                tracing::info!(kind = e.kind().as_str(), student_id = user.user_id(), "Check-in rejected");
            }
            (
                status_for(e.kind()),
                Json(CheckInResponse::rejected(e.kind(), e.to_string())),
            )
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidFormat => StatusCode::BAD_REQUEST,
        ErrorKind::CodeNotFound => StatusCode::NOT_FOUND,
        ErrorKind::CodeExpiredOrInactive => StatusCode::GONE,
        ErrorKind::ClassResolutionFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::status_for;
    use axum::http::StatusCode;
    use services::ErrorKind;

    #[test]
    fn rejection_kinds_map_to_distinct_statuses() {
        assert_eq!(status_for(ErrorKind::InvalidFormat), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::CodeNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::CodeExpiredOrInactive), StatusCode::GONE);
        assert_eq!(
            status_for(ErrorKind::ClassResolutionFailed),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(ErrorKind::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Transient), StatusCode::SERVICE_UNAVAILABLE);
    }
}
