//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from `.env` and environment variables. Values
//! are read through the free accessor functions at the bottom of this module, and can
//! be overridden at runtime (mostly from tests) with the per-field setters.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock, RwLockReadGuard};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    /// Prefix every attendance code starts with, e.g. `HAMARR` in `HAMARR-AB12CD`.
    pub checkin_code_prefix: String,
    /// Number of random characters after the prefix.
    pub checkin_code_length: usize,
    /// `nearest` or `same_day`.
    pub class_resolution_policy: String,
    /// Offset of the dojo's wall clock from UTC. Class dates and times are stored in it.
    pub dojo_utc_offset_minutes: i32,
    pub checkin_max_clock_skew_seconds: i64,
    pub qr_module_px: u32,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable config value");
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing or malformed values fall back to development defaults. `JWT_SECRET`
    /// defaults to an empty string; the API binary refuses to start without one.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "dojo-checkin"),
            log_level: var_or("LOG_LEVEL", "api=info"),
            log_file: var_or("LOG_FILE", "api.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/dojo.db"),
            host: var_or("HOST", "127.0.0.1"),
            port: parse_or("PORT", 3000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            jwt_duration_minutes: parse_or("JWT_DURATION_MINUTES", 60),
            checkin_code_prefix: var_or("CHECKIN_CODE_PREFIX", "HAMARR"),
            checkin_code_length: parse_or("CHECKIN_CODE_LENGTH", 6),
            class_resolution_policy: var_or("CLASS_RESOLUTION_POLICY", "nearest"),
            dojo_utc_offset_minutes: parse_or("DOJO_UTC_OFFSET_MINUTES", 0),
            checkin_max_clock_skew_seconds: parse_or("CHECKIN_MAX_CLOCK_SKEW_SECONDS", 300),
            qr_module_px: parse_or("QR_MODULE_PX", 8),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// A poisoned lock is recovered, since the config holds plain values only.
    pub fn global() -> RwLockReadGuard<'static, AppConfig> {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = AppConfig::from_env();
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_jwt_duration_minutes(value: impl Into<u64>) {
        AppConfig::set_field(|cfg| cfg.jwt_duration_minutes = value.into());
    }

    pub fn set_checkin_code_prefix(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.checkin_code_prefix = value.into());
    }

    pub fn set_checkin_code_length(value: usize) {
        AppConfig::set_field(|cfg| cfg.checkin_code_length = value);
    }

    pub fn set_class_resolution_policy(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.class_resolution_policy = value.into());
    }

    pub fn set_dojo_utc_offset_minutes(value: i32) {
        AppConfig::set_field(|cfg| cfg.dojo_utc_offset_minutes = value);
    }

    pub fn set_checkin_max_clock_skew_seconds(value: i64) {
        AppConfig::set_field(|cfg| cfg.checkin_max_clock_skew_seconds = value);
    }
}

// --- Free accessors ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn jwt_duration_minutes() -> u64 {
    AppConfig::global().jwt_duration_minutes
}

pub fn checkin_code_prefix() -> String {
    AppConfig::global().checkin_code_prefix.clone()
}

pub fn checkin_code_length() -> usize {
    AppConfig::global().checkin_code_length
}

pub fn class_resolution_policy() -> String {
    AppConfig::global().class_resolution_policy.clone()
}

pub fn dojo_utc_offset_minutes() -> i32 {
    AppConfig::global().dojo_utc_offset_minutes
}

pub fn checkin_max_clock_skew_seconds() -> i64 {
    AppConfig::global().checkin_max_clock_skew_seconds
}

pub fn qr_module_px() -> u32 {
    AppConfig::global().qr_module_px
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn setters_override_loaded_values() {
        AppConfig::set_checkin_code_prefix("DOJO");
        AppConfig::set_dojo_utc_offset_minutes(120);
        assert_eq!(checkin_code_prefix(), "DOJO");
        assert_eq!(dojo_utc_offset_minutes(), 120);
        AppConfig::reset();
    }

    #[test]
    #[serial]
    fn unparsable_numbers_fall_back_to_defaults() {
        unsafe {
            env::set_var("CHECKIN_CODE_LENGTH", "lots");
        }
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.checkin_code_length, 6);
        unsafe {
            env::remove_var("CHECKIN_CODE_LENGTH");
        }
    }
}
