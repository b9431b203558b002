//! Driver Configuration
//!
//! Explicit configuration passed to the engine at construction. Loaded from
//! a JSON file, then overridden by `DRIVER_*` environment variables.

use crate::error::{DriverError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Speculative execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeculativeExecutionConfig {
    /// Total executions allowed, initial one included
    pub max_executions: usize,
    /// Delay between two executions
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Timeout of a single attempt
    pub request_timeout_ms: u64,

    /// Idempotence of statements that don't set it
    pub default_idempotence: bool,

    pub load_balancing_policy: String,

    pub retry_policy: String,

    pub speculative_execution: Option<SpeculativeExecutionConfig>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 2000,
            default_idempotence: false,
            load_balancing_policy: "RoundRobinPolicy".to_string(),
            retry_policy: "DefaultRetryPolicy".to_string(),
            speculative_execution: None,
        }
    }
}

impl DriverConfig {
    /// Load from a JSON file. Missing fields take their default value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading driver config from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let config: DriverConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DRIVER_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("DRIVER_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = value.parse().map_err(|_| {
                DriverError::Config(format!("DRIVER_REQUEST_TIMEOUT_MS must be an integer, got '{}'", value))
            })?;
        }
        if let Some(value) = lookup("DRIVER_DEFAULT_IDEMPOTENCE") {
            self.default_idempotence = value.parse().map_err(|_| {
                DriverError::Config(format!("DRIVER_DEFAULT_IDEMPOTENCE must be true or false, got '{}'", value))
            })?;
        }
        if let Some(value) = lookup("DRIVER_LOAD_BALANCING_POLICY") {
            self.load_balancing_policy = value;
        }
        if let Some(value) = lookup("DRIVER_RETRY_POLICY") {
            self.retry_policy = value;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(DriverError::Config("request_timeout_ms must be positive".to_string()));
        }
        if self.load_balancing_policy.trim().is_empty() {
            return Err(DriverError::Config("load_balancing_policy must be set".to_string()));
        }
        if self.retry_policy.trim().is_empty() {
            return Err(DriverError::Config("retry_policy must be set".to_string()));
        }
        if let Some(spec) = &self.speculative_execution {
            if spec.max_executions == 0 {
                return Err(DriverError::Config(
                    "speculative_execution.max_executions must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
