//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

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
    /// Seconds between two runs of the event status sweep.
    pub status_sweep_seconds: u64,
    /// Seconds between two runs of the finalization sweep.
    pub finalize_sweep_seconds: u64,
    /// Endpoint of the external face-verification service. Empty disables it.
    pub face_verification_url: String,
    /// Minimum confidence for a face match to be accepted.
    pub face_match_threshold: f64,
    pub face_verification_timeout_seconds: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

/// Parses an environment variable, falling back to `default` when it is unset or malformed.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "geo-attendance"),
            log_level: var_or("LOG_LEVEL", "api=info,services=info"),
            log_file: var_or("LOG_FILE", "api.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/attendance.db"),
            host: var_or("HOST", "127.0.0.1"),
            port: parse_or("PORT", 3000),
            status_sweep_seconds: parse_or("STATUS_SWEEP_SECONDS", 15),
            finalize_sweep_seconds: parse_or("FINALIZE_SWEEP_SECONDS", 30),
            face_verification_url: var_or("FACE_VERIFICATION_URL", ""),
            face_match_threshold: parse_or("FACE_MATCH_THRESHOLD", 0.6),
            face_verification_timeout_seconds: parse_or("FACE_VERIFICATION_TIMEOUT_SECONDS", 10),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            if let Ok(mut guard) = lock.write() {
                *guard = AppConfig::from_env();
            }
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_port(value: u16) {
        AppConfig::set_field(|cfg| cfg.port = value);
    }

    pub fn set_status_sweep_seconds(value: u64) {
        AppConfig::set_field(|cfg| cfg.status_sweep_seconds = value);
    }

    pub fn set_finalize_sweep_seconds(value: u64) {
        AppConfig::set_field(|cfg| cfg.finalize_sweep_seconds = value);
    }

    pub fn set_face_verification_url(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.face_verification_url = value.into());
    }

    pub fn set_face_match_threshold(value: f64) {
        AppConfig::set_field(|cfg| cfg.face_match_threshold = value);
    }
}

// --- Free accessors used across crates ---

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

pub fn status_sweep_seconds() -> u64 {
    AppConfig::global().status_sweep_seconds.max(1)
}

pub fn finalize_sweep_seconds() -> u64 {
    AppConfig::global().finalize_sweep_seconds.max(1)
}

pub fn face_verification_url() -> String {
    AppConfig::global().face_verification_url.clone()
}

pub fn face_match_threshold() -> f64 {
    AppConfig::global().face_match_threshold
}

pub fn face_verification_timeout_seconds() -> u64 {
    AppConfig::global().face_verification_timeout_seconds
}
