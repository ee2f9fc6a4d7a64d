//! Relay configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML document, then
//! `RELAY_*` environment variables. Unparseable environment values are ignored.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | `window_ms` | `RELAY_WINDOW_MS` | 60 000 |
//! | `max_requests_per_window` | `RELAY_MAX_REQUESTS` | 100 |
//! | `timeout_ms` | `RELAY_TIMEOUT_MS` | 10 000 |
//! | `max_attempts` | `RELAY_MAX_ATTEMPTS` | 3 |
//! | `base_delay_ms` | `RELAY_BASE_DELAY_MS` | 1 000 |
//! | `max_delay_ms` | `RELAY_MAX_DELAY_MS` | none |
//! | `concurrency` | `RELAY_CONCURRENCY` | 3 |
//! | `batch_mode` | - | `grouped` |
//! | `retry_condition` | - | `all` |

use crate::batch::BatchMode;
use crate::executor::{RetryCondition, RetryPolicy};
use crate::resilience::AdmissionConfig;
use crate::types::millis_ceil;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub window_ms: u64,
    pub max_requests_per_window: u32,
    pub timeout_ms: u64,
    /// Total attempts per call, first attempt included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    pub concurrency: usize,
    pub batch_mode: BatchMode,
    pub retry_condition: RetryCondition,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max_requests_per_window: 100,
            timeout_ms: 10_000,
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: None,
            concurrency: 3,
            batch_mode: BatchMode::Grouped,
            retry_condition: RetryCondition::All,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Apply `RELAY_*` environment variables on top of the current values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("RELAY_WINDOW_MS") {
            self.window_ms = v;
        }
        if let Some(v) = env_parse("RELAY_MAX_REQUESTS") {
            self.max_requests_per_window = v;
        }
        if let Some(v) = env_parse("RELAY_TIMEOUT_MS") {
            self.timeout_ms = v;
        }
        if let Some(v) = env_parse("RELAY_MAX_ATTEMPTS") {
            self.max_attempts = v;
        }
        if let Some(v) = env_parse("RELAY_BASE_DELAY_MS") {
            self.base_delay_ms = v;
        }
        if let Some(v) = env_parse::<u64>("RELAY_MAX_DELAY_MS") {
            self.max_delay_ms = Some(v);
        }
        if let Some(v) = env_parse("RELAY_CONCURRENCY") {
            self.concurrency = v;
        }
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window_ms = millis_ceil(window);
        self
    }

    pub fn with_max_requests_per_window(mut self, max: u32) -> Self {
        self.max_requests_per_window = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = millis_ceil(timeout);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = millis_ceil(delay);
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = Some(millis_ceil(delay));
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    pub fn with_retry_condition(mut self, condition: RetryCondition) -> Self {
        self.retry_condition = condition;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn admission(&self) -> AdmissionConfig {
        AdmissionConfig::new()
            .with_window(self.window())
            .with_max_requests(self.max_requests_per_window)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_condition(self.retry_condition);
        if let Some(cap) = self.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(cap));
        }
        policy
    }

    /// Reject values the components cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, bool, &str); 5] = [
            ("window_ms", self.window_ms == 0, "window length must be positive"),
            (
                "max_requests_per_window",
                self.max_requests_per_window == 0,
                "at least one request per window must be admitted",
            ),
            ("timeout_ms", self.timeout_ms == 0, "attempt timeout must be positive"),
            ("max_attempts", self.max_attempts == 0, "at least one attempt is required"),
            ("concurrency", self.concurrency == 0, "concurrency must be at least 1"),
        ];
        for (field, invalid, message) in checks {
            if invalid {
                return Err(Error::configuration_with_context(
                    message,
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("relay_config"),
                ));
            }
        }
        if let Some(cap) = self.max_delay_ms {
            if cap < self.base_delay_ms {
                return Err(Error::configuration_with_context(
                    "max delay must not be below base delay",
                    ErrorContext::new()
                        .with_field_path("max_delay_ms")
                        .with_details(format!("max_delay_ms={} base_delay_ms={}", cap, self.base_delay_ms))
                        .with_source("relay_config"),
                ));
            }
        }
        Ok(())
    }
}
