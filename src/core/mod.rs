//! Core logger types and traits

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod global;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
mod queue;
pub mod registry;
pub mod sink;
pub mod timestamp;

pub use config::{AsyncConfig, LoggerConfig};
pub use dispatcher::{
    AsyncDispatcher, AsyncEntry, EnqueueOutcome, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_NAME,
};
pub use error::{LoggerError, Result};
pub use formatter::{Formatter, JsonFormatter, PatternFormatter, DEFAULT_PATTERN};
pub use log_level::LogLevel;
pub use log_record::{LogRecord, SourceLocation};
pub use logger::{LogOutcome, Logger, LoggerBuilder, Rejection, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use overflow_policy::{ErrorCallback, OverflowCallback, OverflowPolicy};
pub use registry::{Registry, DEFAULT_LOGGER_NAME};
pub use sink::{Sink, SinkChain};
pub use timestamp::TimestampFormat;
