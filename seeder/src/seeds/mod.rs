pub mod attendance_code;
pub mod class;
pub mod user;

/// Locations the seeded schedule and codes use.
pub const LOCATIONS: [&str; 2] = ["Main Dojo", "Annex"];
