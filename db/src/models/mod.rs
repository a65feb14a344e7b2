pub mod attendance_code;
pub mod attendance_record;
pub mod class;
pub mod user;

pub use attendance_code::Entity as AttendanceCode;
pub use attendance_record::Entity as AttendanceRecord;
pub use class::Entity as Class;
pub use user::Entity as User;
