//! Serializable logger settings
//!
//! These structs only describe a logger; reading them from files is left
//! to the application, which can hand the text to [`LoggerConfig::from_json`]. [`LoggerBuilder::from_config`](super::LoggerBuilder::from_config)
//! turns a [`LoggerConfig`] into a builder.

use super::{
    dispatcher::DEFAULT_QUEUE_CAPACITY, error::Result, formatter::DEFAULT_PATTERN,
    log_level::LogLevel, overflow_policy::OverflowPolicy, timestamp::TimestampFormat,
};
use serde::{Deserialize, Serialize};

/// Logger configuration
///
/// # Example
///
/// ```
/// use rust_channel_logger::{LoggerConfig, LogLevel, OverflowPolicy};
///
/// let config = LoggerConfig::from_json(
///     r#"{ "level": "Debug", "async_queue": { "overflow_policy": "DropOldest" } }"#,
/// ).unwrap();
///
/// assert_eq!(config.level, LogLevel::Debug);
/// let queue = config.async_queue.unwrap();
/// assert_eq!(queue.capacity, 8192);
/// assert_eq!(queue.overflow_policy, OverflowPolicy::DropOldest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub pattern: String,
    pub timestamp_format: TimestampFormat,
    /// Render JSON lines instead of the pattern
    pub json: bool,
    /// Async dispatch; `None` means direct mode
    pub async_queue: Option<AsyncConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            pattern: DEFAULT_PATTERN.to_string(),
            timestamp_format: TimestampFormat::default(),
            json: false,
            async_queue: None,
        }
    }
}

impl LoggerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncConfig {
    pub capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}
