//! Settings for the built-in filters.
//!
//! Every section is optional in a configuration file; missing values fall
//! back to the defaults below.
//!
//! ```toml
//! [filters.logging]
//! log_payload = true
//!
//! [filters.rate_limit]
//! max_requests = 20
//! window = "10s"
//! ```

use filter_core::{ConfigError, FilterResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for all built-in filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinFilterSettings {
    /// `logging` filter
    pub logging: LoggingSettings,
    /// `validation` filter
    pub validation: ValidationSettings,
    /// `rateLimit` filter
    #[serde(alias = "rateLimit")]
    pub rate_limit: RateLimitSettings,
}

impl BuiltinFilterSettings {
    /// Check the settings for values the filters cannot work with.
    pub fn validate(&self) -> FilterResult<()> {
        self.rate_limit.validate()
    }
}

/// Settings for the `logging` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log call arguments and response values at info level
    pub log_payload: bool,
}

/// Settings for the `validation` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Reject malformed requests instead of only warning
    pub strict: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Settings for the `rateLimit` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Max calls per method within one window
    pub max_requests: usize,
    /// Length of the sliding window
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl RateLimitSettings {
    /// Create rate limit settings.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    fn validate(&self) -> FilterResult<()> {
        if self.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "filters.rate_limit.max_requests".to_string(),
                value: "0".to_string(),
                reason: "At least one request per window must be allowed".to_string(),
            }
            .into());
        }
        if self.window.is_zero() {
            return Err(ConfigError::InvalidValue {
                parameter: "filters.rate_limit.window".to_string(),
                value: format!("{:?}", self.window),
                reason: "Window must be longer than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}
