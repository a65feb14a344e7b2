pub mod attendance_code_service;
pub mod check_in_service;
pub mod class_resolver;
pub mod error;

pub use attendance_code_service::{AttendanceCodeService, CreateAttendanceCode, QuickDuration};
pub use check_in_service::{CheckInOutcome, CheckInRequest, CheckInService};
pub use class_resolver::{ClassResolver, FirstClassOfDay, NearestScheduledClass};
pub use error::{CheckInError, ErrorKind, IssueError};
