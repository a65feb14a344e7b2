use chrono::{DateTime, Months, TimeDelta, Utc};
use db::models::attendance_code::{CodeFilter, Model as AttendanceCode, NewAttendanceCode};
use db::models::class::Model as ScheduledClass;
use db::models::user::Model as User;
use qr::CodePattern;
use sea_orm::{DatabaseConnection, SqlErr};
use serde::{Deserialize, Serialize};

use crate::error::IssueError;

pub const MAX_DURATION_DAYS: u32 = 3650;
pub const MAX_LOCATION_LEN: usize = 255;
const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Preset lengths for a code's validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickDuration {
    Day,
    Week,
    Month,
    Year,
}

impl QuickDuration {
    /// End of a window of this length starting at `from`. Months and years are calendar
    /// based and clamp to the end of a shorter month.
    pub fn add_to(self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            QuickDuration::Day => from.checked_add_signed(TimeDelta::days(1)),
            QuickDuration::Week => from.checked_add_signed(TimeDelta::days(7)),
            QuickDuration::Month => from.checked_add_months(Months::new(1)),
            QuickDuration::Year => from.checked_add_months(Months::new(12)),
        }
    }
}

/// Parameters for issuing a code.
#[derive(Debug, Clone, Default)]
pub struct CreateAttendanceCode {
    pub issuer_id: i64,
    pub location: String,
    pub class_id: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub duration: Option<QuickDuration>,
    pub duration_days: Option<u32>,
}

impl CreateAttendanceCode {
    /// Validity window for a code issued at `now`.
    ///
    /// Nothing given means a permanent code. An end (explicit or from a duration) without a
    /// start starts the window at `now`. A start alone leaves the window open-ended.
    pub fn window(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), IssueError> {
        if self.duration.is_some() && self.duration_days.is_some() {
            return Err(IssueError::Validation(
                "Give either duration or duration_days, not both".into(),
            ));
        }
        let has_duration = self.duration.is_some() || self.duration_days.is_some();
        if has_duration && self.valid_until.is_some() {
            return Err(IssueError::Validation(
                "Give either a duration or valid_until, not both".into(),
            ));
        }

        let valid_from = match self.valid_from {
            Some(from) => Some(from),
            None if has_duration || self.valid_until.is_some() => Some(now),
            None => None,
        };
        let start = valid_from.unwrap_or(now);

        let valid_until = if let Some(preset) = self.duration {
            Some(preset.add_to(start).ok_or_else(out_of_range)?)
        } else if let Some(days) = self.duration_days {
            if !(1..=MAX_DURATION_DAYS).contains(&days) {
                return Err(IssueError::Validation(format!(
                    "duration_days must be between 1 and {MAX_DURATION_DAYS}"
                )));
            }
            Some(
                start
                    .checked_add_signed(TimeDelta::days(i64::from(days)))
                    .ok_or_else(out_of_range)?,
            )
        } else {
            self.valid_until
        };

        if let (Some(from), Some(until)) = (valid_from, valid_until) {
            if until < from {
                return Err(IssueError::Validation(
                    "valid_until must not be before valid_from".into(),
                ));
            }
        }
        Ok((valid_from, valid_until))
    }
}

fn out_of_range() -> IssueError {
    IssueError::Validation("Validity window is out of range".into())
}

/// Staff operations on attendance codes.
pub struct AttendanceCodeService;

impl AttendanceCodeService {
    /// Issues a fresh, active code.
    ///
    /// The code string is random; on the rare collision with an existing code a new one is
    /// drawn, up to a few times.
    pub async fn issue(
        db: &DatabaseConnection,
        pattern: &CodePattern,
        params: CreateAttendanceCode,
        now: DateTime<Utc>,
    ) -> Result<AttendanceCode, IssueError> {
        let location = params.location.trim();
        if location.is_empty() {
            return Err(IssueError::Validation("location is required".into()));
        }
        if location.chars().count() > MAX_LOCATION_LEN {
            return Err(IssueError::Validation(format!(
                "location must be at most {MAX_LOCATION_LEN} characters"
            )));
        }
        let (valid_from, valid_until) = params.window(now)?;

        if User::find_by_id(db, params.issuer_id).await?.is_none() {
            return Err(IssueError::UnknownIssuer(params.issuer_id));
        }

        if let Some(class_id) = params.class_id {
            if ScheduledClass::find_by_id(db, class_id).await?.is_none() {
                return Err(IssueError::ClassNotFound(class_id));
            }
        }

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let new = NewAttendanceCode {
                issuer_id: params.issuer_id,
                class_id: params.class_id,
                location: location.to_owned(),
                code: pattern.generate(),
                valid_from,
                valid_until,
            };
            match AttendanceCode::create(db, new).await {
                Ok(code) => {
                    tracing::info!(
                        id = code.id,
                        issuer_id = code.issuer_id,
                        location = %code.location,
                        class_id = ?code.class_id,
                        "Attendance code issued"
                    );
                    return Ok(code);
                }
                Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    tracing::warn!(attempt, "Generated attendance code collided, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(IssueError::CodeSpaceExhausted)
    }

    /// One page of codes and the total match count.
    pub async fn list(
        db: &DatabaseConnection,
        filter: &CodeFilter,
        now: DateTime<Utc>,
    ) -> Result<(Vec<AttendanceCode>, u64), IssueError> {
        Ok(AttendanceCode::filter(db, filter, now).await?)
    }

    pub async fn find(db: &DatabaseConnection, id: i64) -> Result<AttendanceCode, IssueError> {
        AttendanceCode::find_by_id(db, id)
            .await?
            .ok_or(IssueError::NotFound(id))
    }

    /// Turns a code on or off. Setting the current value again succeeds without a write.
    pub async fn set_active(
        db: &DatabaseConnection,
        id: i64,
        active: bool,
    ) -> Result<AttendanceCode, IssueError> {
        let code = AttendanceCode::set_active(db, id, active)
            .await?
            .ok_or(IssueError::NotFound(id))?;
        tracing::info!(id, active, "Attendance code activation changed");
        Ok(code)
    }

    pub async fn deactivate(db: &DatabaseConnection, id: i64) -> Result<AttendanceCode, IssueError> {
        Self::set_active(db, id, false).await
    }

    /// Removes the code. Attendance already recorded with it is kept.
    pub async fn delete(db: &DatabaseConnection, id: i64) -> Result<(), IssueError> {
        if AttendanceCode::delete_by_id(db, id).await? {
            tracing::info!(id, "Attendance code deleted");
            Ok(())
        } else {
            Err(IssueError::NotFound(id))
        }
    }
}
