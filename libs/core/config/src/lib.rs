//! Environment-driven configuration shared by every crate in the workspace
//!
//! Settings come from environment variables. Each config struct implements
//! [`FromEnv`] and reports problems as [`ConfigError`].

pub mod tracing;

use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Environment variable '{key}' could not be parsed: {details}")]
    ParseError { key: String, details: String },

    #[error("Invalid value for '{key}': {details}")]
    InvalidValue { key: String, details: String },
}

/// Where the process runs: an operator's shell or a deploy pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Read `APP_ENV`; anything other than `production`/`prod` is development
    pub fn from_env() -> Self {
        env::var("APP_ENV")
            .map(|value| Self::from_name(&value))
            .unwrap_or(Environment::Development)
    }

    fn from_name(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Configuration that can be built from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Value of `key`, or `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Return the value of the first variable in `keys` that is set.
///
/// Used for settings that accept several historical names
/// (e.g. `MONGODB_URL`, `MONGO_URL`).
pub fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env::var(key).ok())
}

/// Parse an environment variable into `T`, falling back to `default` when unset.
///
/// A variable that is set but does not parse is an error, never silently
/// replaced by the default.
pub fn env_parse_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("{}", e),
        }),
        Err(_) => Ok(default),
    }
}
