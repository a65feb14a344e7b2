//! # Attendance routes
//!
//! Staff only (instructor/admin):
//! - `GET    /attendance/codes`     list codes with filters and pagination
//! - `POST   /attendance/codes`     issue a code
//! - `PUT    /attendance/codes?id=` activate or deactivate a code
//! - `DELETE /attendance/codes?id=` delete a code
//! - `GET    /attendance/codes/qr?id=` render a code as a QR symbol
//!
//! Any authenticated user:
//! - `POST /attendance/check-in` check in with a scanned or typed code
//! - `GET  /attendance/me`       the caller's attendance history

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::auth::guards::{allow_authenticated, allow_staff};
use crate::state::AppState;

pub mod common;
pub mod delete;
pub mod get;
pub mod post;
pub mod put;

use delete::delete_code;
use get::{get_code_qr, list_codes, my_attendance};
use post::{check_in, issue_code};
use put::set_code_active;

pub fn attendance_routes(app_state: AppState) -> Router<AppState> {
    let staff = Router::new()
        .route(
            "/codes",
            get(list_codes)
                .post(issue_code)
                .put(set_code_active)
                .delete(delete_code),
        )
        .route("/codes/qr", get(get_code_qr))
        .route_layer(from_fn_with_state(app_state, allow_staff));

    let members = Router::new()
        .route("/check-in", post(check_in))
        .route("/me", get(my_attendance))
        .route_layer(from_fn(allow_authenticated));

    staff.merge(members)
}
