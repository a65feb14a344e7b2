//! # Routes
//!
//! Everything below is mounted under `/api` by the binary:
//!
//! - `/health`: liveness and database reachability
//! - `/attendance`: code issuance for staff, check-in and history for students

use axum::Router;

use crate::routes::{attendance::attendance_routes, health::health_routes};
use crate::state::AppState;

pub mod attendance;
pub mod common;
pub mod health;

pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/attendance", attendance_routes(app_state.clone()))
        .with_state(app_state)
}
