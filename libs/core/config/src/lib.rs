pub mod server;
pub mod tracing;
pub mod version;

use std::env;
use std::time::Duration;
use thiserror::Error;

pub use version::AppInfo;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment (dev = local/kind, prod = full k8s)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development, // Local dev or kind cluster
    Production,  // Full k8s cluster
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load and parse environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load and parse environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Helper to load a duration from an environment variable with a default value
///
/// See [`parse_duration`] for the accepted formats.
pub fn env_duration(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(key) {
        Ok(value) => parse_duration(key, &value),
        Err(_) => Ok(default),
    }
}

/// Parse a duration such as `15`, `15s`, `500ms`, `2m` or `1h`.
///
/// A bare number is read as seconds.
pub fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);

    let parse_error = |details: String| ConfigError::ParseError {
        key: key.to_string(),
        details,
    };

    let amount: u64 = amount
        .parse()
        .map_err(|e| parse_error(format!("invalid duration '{}': {}", value, e)))?;

    let seconds_per_unit = match unit.trim() {
        "ms" => return Ok(Duration::from_millis(amount)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => {
            return Err(parse_error(format!(
                "unknown duration unit '{}' in '{}'",
                other, value
            )));
        }
    };

    amount
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| parse_error(format!("duration '{}' is too large", value)))
}
