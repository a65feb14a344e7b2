use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use db::models::attendance_code::Model as AttendanceCode;
use db::models::attendance_record::{CheckInMethod, Model as AttendanceRecord, NewPresence};
use db::models::class::Model as ScheduledClass;
use db::models::user::Model as User;
use qr::{CodePattern, PatternError, extract_code};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use util::config;

use crate::class_resolver::{self, ClassResolver};
use crate::error::CheckInError;

/// A student's attempt to check in.
#[derive(Debug, Clone)]
pub struct CheckInRequest {
    /// Authenticated caller. Never taken from the request body.
    pub student_id: i64,
    /// Text as scanned or typed.
    pub raw_code: String,
    /// When the client says the scan happened.
    pub client_time: Option<DateTime<Utc>>,
    pub method: CheckInMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInOutcome {
    pub record: AttendanceRecord,
    pub class: ScheduledClass,
    /// The student was already marked present; nothing new was written.
    pub already_checked_in: bool,
}

pub struct CheckInService {
    pattern: CodePattern,
    resolver: Arc<dyn ClassResolver>,
    max_clock_skew: TimeDelta,
}

impl CheckInService {
    pub fn new(pattern: CodePattern, resolver: Arc<dyn ClassResolver>) -> Self {
        Self {
            pattern,
            resolver,
            max_clock_skew: TimeDelta::seconds(300),
        }
    }

    pub fn with_max_clock_skew(mut self, seconds: i64) -> Self {
        self.max_clock_skew = TimeDelta::seconds(seconds.max(0));
        self
    }

    pub fn from_config() -> Result<Self, PatternError> {
        Ok(Self::new(CodePattern::from_config()?, class_resolver::from_config())
            .with_max_clock_skew(config::checkin_max_clock_skew_seconds()))
    }

    pub fn pattern(&self) -> &CodePattern {
        &self.pattern
    }

    pub fn resolver(&self) -> &dyn ClassResolver {
        self.resolver.as_ref()
    }

    /// The instant recorded for a check-in: the client's timestamp if it agrees with the
    /// server clock within the allowed skew, the server clock otherwise.
    pub fn effective_time(
        &self,
        client_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        match client_time {
            Some(at) if (at - now).abs() <= self.max_clock_skew => at,
            Some(at) => {
                tracing::warn!(client = %at, server = %now, "Client clock skew too large, using server time");
                now
            }
            None => now,
        }
    }

    /// Validates a code and marks the caller present at the class it resolves to.
    ///
    /// Validity is judged against `now` (the server clock). Checking in again for the
    /// same class succeeds with `already_checked_in` set and writes nothing.
    pub async fn check_in(
        &self,
        db: &DatabaseConnection,
        request: CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, CheckInError> {
        if User::find_by_id(db, request.student_id).await?.is_none() {
            tracing::warn!(student_id = request.student_id, "Check-in by unknown user");
            return Err(CheckInError::Unauthorized);
        }

        let code = extract_code(&request.raw_code, &self.pattern)?;

        let Some(attendance_code) = AttendanceCode::find_by_code(db, &code).await? else {
            tracing::info!(student_id = request.student_id, code = %code, "Unknown attendance code");
            return Err(CheckInError::CodeNotFound);
        };
        if !attendance_code.is_currently_valid(now) {
            tracing::info!(
                student_id = request.student_id,
                code_id = attendance_code.id,
                "Expired or inactive attendance code"
            );
            return Err(CheckInError::CodeExpiredOrInactive);
        }

        let at = self.effective_time(request.client_time, now);
        let class = self.resolve_class(db, &attendance_code, at).await?;

        let presence = AttendanceRecord::record_presence(
            db,
            NewPresence {
                student_id: request.student_id,
                class_id: class.id,
                code_id: Some(attendance_code.id),
                check_in_time: at,
                method: request.method,
            },
        )
        .await?;

        let already_checked_in = !presence.is_new();
        tracing::info!(
            student_id = request.student_id,
            class_id = class.id,
            code_id = attendance_code.id,
            method = %request.method,
            already_checked_in,
            "Check-in accepted"
        );

        Ok(CheckInOutcome {
            record: presence.into_record(),
            class,
            already_checked_in,
        })
    }

    async fn resolve_class(
        &self,
        db: &DatabaseConnection,
        code: &AttendanceCode,
        at: DateTime<Utc>,
    ) -> Result<ScheduledClass, CheckInError> {
        let class = match code.class_id {
            Some(class_id) => ScheduledClass::find_by_id(db, class_id).await?,
            None => self.resolver.resolve(db, &code.location, at).await?,
        };
        class.ok_or_else(|| {
            tracing::info!(
                code_id = code.id,
                location = %code.location,
                policy = self.resolver.policy(),
                "No class to attribute check-in to"
            );
            CheckInError::ClassResolutionFailed
        })
    }
}
