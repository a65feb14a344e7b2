use std::sync::Arc;

use api::{auth::generate_jwt, routes::routes, state::AppState};
use axum::{Router, response::Response};
use chrono::{NaiveTime, Utc};
use db::{
    models::{
        class::{Model as ScheduledClass, NewClass},
        user::{Model as User, Role},
    },
    test_utils::setup_test_db,
};
use qr::CodePattern;
use serde_json::Value;
use services::{CheckInService, NearestScheduledClass};
use util::config::AppConfig;

pub const TEST_SECRET: &str = "attendance-test-secret";

/// Router mounted under `/api` over a fresh in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    AppConfig::set_jwt_secret(TEST_SECRET);

    let db = setup_test_db().await;
    let pattern = CodePattern::new("HAMARR", 6).expect("valid test pattern");
    let check_in = CheckInService::new(pattern, Arc::new(NearestScheduledClass::new(0)))
        .with_max_clock_skew(300);
    let app_state = AppState::new(db, check_in);

    let app = Router::new().nest("/api", routes(app_state.clone()));
    (app, app_state)
}

pub struct TestCtx {
    pub instructor: User,
    pub student: User,
    pub other_student: User,
    /// Scheduled today at "Main Dojo".
    pub class: ScheduledClass,
}

pub async fn setup(state: &AppState) -> TestCtx {
    let db = state.db();
    let instructor = User::create(db, "sensei", "sensei@test.com", Role::Instructor)
        .await
        .unwrap();
    let student = User::create(db, "student1", "student1@test.com", Role::Student)
        .await
        .unwrap();
    let other_student = User::create(db, "student2", "student2@test.com", Role::Student)
        .await
        .unwrap();
    let class = ScheduledClass::create(
        db,
        NewClass {
            name: "Evening Karate".into(),
            discipline: "Karate".into(),
            location: "Main Dojo".into(),
            class_date: Utc::now().date_naive(),
            start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            instructor_id: Some(instructor.id),
        },
    )
    .await
    .unwrap();

    TestCtx {
        instructor,
        student,
        other_student,
        class,
    }
}

pub fn bearer(user_id: i64, admin: bool) -> String {
    let (token, _) = generate_jwt(user_id, admin).unwrap();
    format!("Bearer {token}")
}

pub async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
