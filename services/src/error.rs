use qr::ExtractError;
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Failures of the staff-facing code operations.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("{0}")]
    Validation(String),
    #[error("User {0} is not known here")]
    UnknownIssuer(i64),
    #[error("Class {0} does not exist")]
    ClassNotFound(i64),
    #[error("Attendance code {0} not found")]
    NotFound(i64),
    #[error("Could not generate a unique code, please try again")]
    CodeSpaceExhausted,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Check-in rejection kinds, as sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidFormat,
    CodeNotFound,
    CodeExpiredOrInactive,
    ClassResolutionFailed,
    Unauthorized,
    Transient,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::CodeNotFound => "code_not_found",
            ErrorKind::CodeExpiredOrInactive => "code_expired_or_inactive",
            ErrorKind::ClassResolutionFailed => "class_resolution_failed",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Transient => "transient",
        }
    }
}

/// Why a check-in was refused. Every variant but `Transient` is the user's to fix; the
/// `Display` text is shown to them as-is.
#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("That doesn't look like an attendance code")]
    InvalidFormat(#[source] ExtractError),
    #[error("Attendance code not found. Check it and try again")]
    CodeNotFound,
    #[error("This attendance code has expired or been deactivated. Ask staff for a new one")]
    CodeExpiredOrInactive,
    #[error("No class is scheduled for this code right now")]
    ClassResolutionFailed,
    #[error("Please sign in again")]
    Unauthorized,
    #[error("Could not record attendance right now. Please try again")]
    Transient(#[from] DbErr),
}

impl CheckInError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckInError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            CheckInError::CodeNotFound => ErrorKind::CodeNotFound,
            CheckInError::CodeExpiredOrInactive => ErrorKind::CodeExpiredOrInactive,
            CheckInError::ClassResolutionFailed => ErrorKind::ClassResolutionFailed,
            CheckInError::Unauthorized => ErrorKind::Unauthorized,
            CheckInError::Transient(_) => ErrorKind::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckInError::Transient(_))
    }
}

impl From<ExtractError> for CheckInError {
    fn from(err: ExtractError) -> Self {
        CheckInError::InvalidFormat(err)
    }
}
