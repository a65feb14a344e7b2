use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use db::models::attendance_code::CodeFilter;
use db::models::attendance_record::Model as AttendanceRecord;
use qr::encode::MODULE_PX_RANGE;
use services::{AttendanceCodeService, IssueError};
use util::config;

use super::common::{
    AttendanceCodeResponse, AttendanceView, CodeListResponse, ListCodesQuery, QrQuery, SORT_FIELDS,
};
use crate::auth::AuthUser;
use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::routes::common::clamp_pagination;
use crate::state::AppState;

/// GET `/api/attendance/codes`
///
/// **Auth**: staff
///
/// **Query**
/// - `page`, `per_page` (default 1 / 20, at most 100)
/// - `q`: location substring
/// - `sort`: `created_at`, `location` or `valid_until`, prefix `-` for descending
/// - `active_only`: only codes a student could check in with right now
/// - `class_id`
///
/// **Response**: `200 OK` with `{ codes, page, per_page, total }`; each code carries
/// `is_currently_valid`. `400` for an unknown sort field.
pub async fn list_codes(
    State(state): State<AppState>,
    Query(query): Query<ListCodesQuery>,
) -> (StatusCode, Json<ApiResponse<CodeListResponse>>) {
    if let Some(sort) = query.sort.as_deref() {
        let field = sort.strip_prefix('-').unwrap_or(sort);
        if !SORT_FIELDS.contains(&field) {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("Invalid sort field")),
            );
        }
    }

    let (page, per_page) = clamp_pagination(query.page, query.per_page);
    let filter = CodeFilter {
        active_only: query.active_only.unwrap_or(false),
        class_id: query.class_id,
        issuer_id: None,
        q: query.q,
        sort: query.sort,
        page,
        per_page,
    };

    let now = Utc::now();
    match AttendanceCodeService::list(state.db(), &filter, now).await {
        Ok((codes, total)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                CodeListResponse {
                    codes: codes
                        .into_iter()
                        .map(|c| AttendanceCodeResponse::from_model(c, now))
                        .collect(),
                    page,
                    per_page,
                    total,
                },
                "Attendance codes retrieved",
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list attendance codes");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to retrieve attendance codes")),
            )
        }
    }
}

/// GET `/api/attendance/codes/qr?id=<id>&format=svg|png&module_px=<n>`
///
/// The code as a QR symbol for printing or display. Defaults to SVG at `QR_MODULE_PX`
/// pixels per module.
///
/// **Auth**: staff
///
/// **Responses**
/// - `200 OK` `image/svg+xml` or `image/png`
/// - `400 Bad Request` missing id, unknown format, or `module_px` outside 1..=64
/// - `404 Not Found`
pub async fn get_code_qr(State(state): State<AppState>, Query(query): Query<QrQuery>) -> Response {
    fn error(status: StatusCode, message: impl Into<String>) -> Response {
        (status, Json(ApiResponse::<Empty>::error(message))).into_response()
    }

    let Some(id) = query.id else {
        return error(StatusCode::BAD_REQUEST, "id is required");
    };
    let module_px = query.module_px.unwrap_or_else(config::qr_module_px);
    if !MODULE_PX_RANGE.contains(&module_px) {
        return error(
            StatusCode::BAD_REQUEST,
            format!(
                "module_px must be between {} and {}",
                MODULE_PX_RANGE.start(),
                MODULE_PX_RANGE.end()
            ),
        );
    }
    let format = query.format.as_deref().unwrap_or("svg").to_ascii_lowercase();
    if format != "svg" && format != "png" {
        return error(StatusCode::BAD_REQUEST, "format must be svg or png");
    }

    let code = match AttendanceCodeService::find(state.db(), id).await {
        Ok(code) => code,
        Err(IssueError::NotFound(_)) => {
            return error(StatusCode::NOT_FOUND, "Attendance code not found");
        }
        Err(e) => {
            tracing::error!(error = %e, id, "Failed to load attendance code");
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load attendance code");
        }
    };

    let matrix = match qr::encode(&code.code) {
        Ok(matrix) => matrix,
        Err(e) => {
            tracing::error!(error = %e, id, "Failed to encode attendance code");
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render QR code");
        }
    };

    if format == "png" {
        match matrix.to_png(module_px) {
            Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
            Err(e) => {
                tracing::error!(error = %e, id, "Failed to write QR PNG");
                error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render QR code")
            }
        }
    } else {
        (
            [(header::CONTENT_TYPE, "image/svg+xml")],
            matrix.to_svg(module_px),
        )
            .into_response()
    }
}

/// GET `/api/attendance/me`
///
/// The caller's present records with class details, most recent check-in first.
///
/// **Auth**: any authenticated user
pub async fn my_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Vec<AttendanceView>>>) {
    match AttendanceRecord::history_for_student(state.db(), user.user_id()).await {
        Ok(rows) => {
            let history = rows
                .iter()
                .filter_map(|(record, class)| class.as_ref().map(|c| AttendanceView::new(record, c)))
                .collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(history, "Attendance history retrieved")),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, student_id = user.user_id(), "Failed to load attendance history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to retrieve attendance history")),
            )
        }
    }
}
