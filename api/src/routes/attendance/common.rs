use chrono::{DateTime, Utc};
use db::models::attendance_code::Model as AttendanceCode;
use db::models::attendance_record::{CheckInMethod, Model as AttendanceRecord};
use db::models::class::Model as ScheduledClass;
use serde::{Deserialize, Serialize};
use services::{ErrorKind, QuickDuration};
use validator::Validate;

pub const SORT_FIELDS: [&str; 3] = ["created_at", "location", "valid_until"];

#[derive(Debug, Deserialize, Validate, Default)]
pub struct CreateCodeReq {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "location is required (at most 255 characters)"))]
    pub location: String,
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<QuickDuration>,
    #[serde(default)]
    #[validate(range(min = 1, max = 3650, message = "duration_days must be between 1 and 3650"))]
    pub duration_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListCodesQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub active_only: Option<bool>,
    pub class_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QrQuery {
    pub id: Option<i64>,
    pub format: Option<String>,
    pub module_px: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveReq {
    pub is_active: bool,
}

/// Student-supplied check-in payload. A `student_id` field, if sent, is ignored.
#[derive(Debug, Deserialize, Default)]
pub struct CheckInReq {
    #[serde(default)]
    pub qr_code: String,
    /// ISO 8601. Unparsable values are treated as absent.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub check_in_method: Option<CheckInMethod>,
}

#[derive(Debug, Serialize, Default)]
pub struct AttendanceCodeResponse {
    pub id: i64,
    pub issuer_id: i64,
    pub class_id: Option<i64>,
    pub location: String,
    pub code: String,
    pub is_active: bool,
    pub is_currently_valid: bool,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub created_at: String,
}

impl AttendanceCodeResponse {
    pub fn from_model(code: AttendanceCode, now: DateTime<Utc>) -> Self {
        Self {
            is_currently_valid: code.is_currently_valid(now),
            id: code.id,
            issuer_id: code.issuer_id,
            class_id: code.class_id,
            location: code.location,
            code: code.code,
            is_active: code.is_active,
            valid_from: code.valid_from.map(|t| t.to_rfc3339()),
            valid_until: code.valid_until.map(|t| t.to_rfc3339()),
            created_at: code.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct CodeListResponse {
    pub codes: Vec<AttendanceCodeResponse>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

/// A present record joined with its class, as students see it.
#[derive(Debug, Serialize, Default)]
pub struct AttendanceView {
    pub id: i64,
    pub class_id: i64,
    pub class_name: String,
    /// `YYYY-MM-DD`
    pub class_date: String,
    /// `HH:MM`
    pub class_time: String,
    pub discipline: String,
    pub location: String,
    pub attended: bool,
    pub check_in_time: Option<String>,
    pub check_in_method: Option<CheckInMethod>,
}

impl AttendanceView {
    pub fn new(record: &AttendanceRecord, class: &ScheduledClass) -> Self {
        Self {
            id: record.id,
            class_id: class.id,
            class_name: class.name.clone(),
            class_date: class.class_date.format("%Y-%m-%d").to_string(),
            class_time: class.start_time.format("%H:%M").to_string(),
            discipline: class.discipline.clone(),
            location: class.location.clone(),
            attended: record.attended,
            check_in_time: record.check_in_time.map(|t| t.to_rfc3339()),
            check_in_method: record.check_in_method,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceView>,
    pub already_checked_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl CheckInResponse {
    pub fn checked_in(attendance: AttendanceView, already_checked_in: bool) -> Self {
        let message = if already_checked_in {
            format!("You are already checked in to {}", attendance.class_name)
        } else {
            format!("Checked in to {}", attendance.class_name)
        };
        Self {
            success: true,
            message,
            attendance: Some(attendance),
            already_checked_in,
            error: None,
        }
    }

    pub fn rejected(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            attendance: None,
            already_checked_in: false,
            error: Some(kind),
        }
    }
}
