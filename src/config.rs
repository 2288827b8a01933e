//! Service configuration loaded from the environment.
//!
//! Loaded once at startup. Every value has a default except the queue
//! address, which is only needed when the export queue is switched on and is
//! therefore checked when a message is sent rather than here.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TABLE_NAME: &str = "TodoItems-dev";
pub const DEFAULT_BUCKET_NAME: &str = "todo-exports-dev";
pub const DEFAULT_FLAG_PREFIX: &str = "/todoapp/dev/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Deployment environment. Only `Production` changes behavior: error
/// responses stop carrying a `stack` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn exposes_stack(&self) -> bool {
        !matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// AWS region for every client (from AWS_REGION).
    pub region: String,
    /// Record table (from DYNAMODB_TABLE_NAME).
    pub table_name: String,
    /// Export bucket (from S3_BUCKET_NAME).
    pub bucket_name: String,
    /// Export queue URL (from SQS_QUEUE_URL). Unset disables nothing by
    /// itself; enqueueing fails with a configuration error.
    pub queue_url: Option<String>,
    /// Parameter namespace holding feature flags (from FEATURE_FLAG_PREFIX).
    pub flag_prefix: String,
    /// Artificial delay before a synchronous export (from EXPORT_DELAY_SECONDS).
    pub export_delay: Option<Duration>,
    /// From APP_ENV.
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            bucket_name: DEFAULT_BUCKET_NAME.to_string(),
            queue_url: None,
            flag_prefix: DEFAULT_FLAG_PREFIX.to_string(),
            export_delay: None,
            environment: Environment::Development,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, reading `.env` first
    /// when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let environment = match non_empty("APP_ENV") {
            Some(raw) => Environment::from_str(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "APP_ENV".to_string(),
                message: format!("expected development, test or production, got {raw:?}"),
            })?,
            None => defaults.environment,
        };

        Ok(Self {
            region: non_empty("AWS_REGION").unwrap_or(defaults.region),
            table_name: non_empty("DYNAMODB_TABLE_NAME").unwrap_or(defaults.table_name),
            bucket_name: non_empty("S3_BUCKET_NAME").unwrap_or(defaults.bucket_name),
            queue_url: non_empty("SQS_QUEUE_URL"),
            flag_prefix: non_empty("FEATURE_FLAG_PREFIX").unwrap_or(defaults.flag_prefix),
            export_delay: parse_delay(non_empty("EXPORT_DELAY_SECONDS"))?,
            environment,
        })
    }
}

fn parse_delay(raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let seconds: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: "EXPORT_DELAY_SECONDS".to_string(),
        message: format!("expected a number of seconds, got {raw:?}"),
    })?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::InvalidValue {
            key: "EXPORT_DELAY_SECONDS".to_string(),
            message: "must be a non-negative number".to_string(),
        });
    }

    if seconds == 0.0 {
        return Ok(None);
    }

    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key: "EXPORT_DELAY_SECONDS".to_string(),
            message: e.to_string(),
        })
}
