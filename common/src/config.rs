//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
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
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    /// Hex-encoded HMAC key signing every QR token payload. Required:
    /// running without one would silently disable tamper detection.
    pub attendance_secret: String,
    /// Validity window of an issued QR token, in seconds.
    pub token_ttl_seconds: i64,
    /// `flag` or `reject` - what to do when one device marks for two students.
    pub device_reuse_policy: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// This method is used internally to populate the singleton. It panics
    /// if required variables are missing or improperly formatted.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "rollcall".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH").expect("DATABASE_PATH is required"),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .unwrap(),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET is required"),
            jwt_duration_minutes: env::var("JWT_DURATION_MINUTES")
                .unwrap_or("60".into())
                .parse()
                .unwrap(),
            attendance_secret: env::var("ATTENDANCE_SECRET")
                .expect("ATTENDANCE_SECRET is required (generate with: openssl rand -hex 32)"),
            token_ttl_seconds: env::var("TOKEN_TTL_SECONDS")
                .unwrap_or("15".into())
                .parse()
                .unwrap(),
            device_reuse_policy: env::var("DEVICE_REUSE_POLICY").unwrap_or_else(|_| "flag".into()),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
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
            let mut guard = lock.write().unwrap();
            *guard = AppConfig::from_env();
        }
    }

    /// Seeds the singleton with deterministic values, bypassing the
    /// environment entirely. Intended for tests, where required variables
    /// like `DATABASE_PATH` are meaningless.
    pub fn init_test_defaults() {
        let cfg = AppConfig {
            env: "test".into(),
            project_name: "rollcall".into(),
            log_level: "api=info".into(),
            log_file: "api.log".into(),
            log_to_stdout: false,
            database_path: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "test-jwt-secret".into(),
            jwt_duration_minutes: 60,
            attendance_secret: "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff"
                .into(),
            token_ttl_seconds: 15,
            device_reuse_policy: "flag".into(),
        };
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(cfg.clone()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        *guard = cfg;
    }

    /// Generic internal setter for any field in the config.
    ///
    /// Used by public per-field setter methods.
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

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_attendance_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.attendance_secret = value.into());
    }

    pub fn set_token_ttl_seconds(value: i64) {
        AppConfig::set_field(|cfg| cfg.token_ttl_seconds = value);
    }

    pub fn set_device_reuse_policy(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.device_reuse_policy = value.into());
    }
}

// --- Convenience accessors, mirroring the fields above ---

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

pub fn attendance_secret() -> String {
    AppConfig::global().attendance_secret.clone()
}

pub fn token_ttl_seconds() -> i64 {
    AppConfig::global().token_ttl_seconds
}

pub fn device_reuse_policy() -> String {
    AppConfig::global().device_reuse_policy.clone()
}
