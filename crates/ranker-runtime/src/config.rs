//! Runtime configuration.
//!
//! Knobs for one ranking run. Defaults reproduce the plain sequential
//! behavior: one candidate at a time, a 600 s budget per scorer call, no
//! retries and no reply cache. Every knob can be overridden from the
//! environment:
//!
//! | variable             | meaning                                   |
//! |----------------------|-------------------------------------------|
//! | `RANKER_CONCURRENCY` | candidates scored at once (>= 1)          |
//! | `RANKER_TIMEOUT`     | per-call timeout, humantime (`90s`, `2m`) |
//! | `RANKER_MAX_RETRIES` | extra attempts on transient failures      |
//! | `RANKER_CACHE`       | `true`/`false`, enables the reply cache   |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ranker_core::PromptError;

pub const CONCURRENCY_ENV: &str = "RANKER_CONCURRENCY";
pub const TIMEOUT_ENV: &str = "RANKER_TIMEOUT";
pub const MAX_RETRIES_ENV: &str = "RANKER_MAX_RETRIES";
pub const CACHE_ENV: &str = "RANKER_CACHE";

/// Missing or invalid configuration. Fatal: no candidate is processed.
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown scorer backend '{name}'. Available: {available:?}")]
    UnknownBackend { name: String, available: Vec<String> },

    #[error("Failed to prepare prompts: {0}")]
    Prompt(String),
}

impl From<PromptError> for ConfigurationError {
    fn from(err: PromptError) -> Self {
        ConfigurationError::Prompt(err.to_string())
    }
}

/// Configuration for a [`Ranker`](crate::Ranker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Candidates scored at once; 1 is strictly sequential
    pub concurrency: usize,

    /// Budget for a single scorer call
    #[serde(with = "duration_human")]
    pub timeout: Duration,

    /// Extra attempts after a transient failure
    pub max_retries: usize,

    /// First backoff delay; doubles on each retry
    #[serde(with = "duration_human")]
    pub retry_min_delay: Duration,

    /// Serve repeated prompts from memory
    pub cache_enabled: bool,

    pub cache_capacity: u64,

    /// Model override passed to the scorer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

mod duration_human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            timeout: Duration::from_secs(600),
            max_retries: 0,
            retry_min_delay: Duration::from_secs(1),
            cache_enabled: false,
            cache_capacity: 1_024,
            model: None,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, test map, ...).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        if let Some(value) = lookup(CONCURRENCY_ENV) {
            self.concurrency = parse_number(CONCURRENCY_ENV, &value)?;
        }
        if let Some(value) = lookup(TIMEOUT_ENV) {
            self.timeout = humantime::parse_duration(value.trim()).map_err(|e| {
                ConfigurationError::InvalidValue {
                    key: TIMEOUT_ENV.to_string(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Some(value) = lookup(MAX_RETRIES_ENV) {
            self.max_retries = parse_number(MAX_RETRIES_ENV, &value)?;
        }
        if let Some(value) = lookup(CACHE_ENV) {
            self.cache_enabled = parse_flag(CACHE_ENV, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.concurrency == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidValue {
                key: "timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigurationError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}
