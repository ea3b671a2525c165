//! # Rust Channel Logger
//!
//! A leveled, multi-sink logging engine for latency-sensitive code paths.
//!
//! ## Features
//!
//! - **Cheap filtering**: a disabled level costs one relaxed atomic load
//! - **Named loggers**: a [`Registry`] hands out shared loggers by name
//! - **Multiple sinks**: file, console and custom [`Sink`]s, written in order
//! - **Async dispatch**: a bounded queue drained by one worker thread, with
//!   configurable [`OverflowPolicy`] and flush barriers
//! - **Ready default logger**: [`info`], [`warn`] and friends log to stdout
//!   through the global registry with no setup
//!
//! ## Example
//!
//! ```
//! use rust_channel_logger::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! let logger = registry
//!     .get_or_create_with("app", || {
//!         Logger::builder("app")
//!             .level(LogLevel::Debug)
//!             .sink(Arc::new(NullSink::new()))
//!             .async_mode(4096)
//!             .build()
//!     })
//!     .unwrap();
//!
//! logger.info("service started");
//! logger.flush().unwrap();
//! registry.shutdown().unwrap();
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AsyncDispatcher, Formatter, JsonFormatter, LogLevel, LogOutcome, LogRecord, Logger,
        LoggerBuilder, LoggerConfig, LoggerError, OverflowPolicy, PatternFormatter, Registry,
        Result, Sink, TimestampFormat,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, FlushPolicy, NullSink};
}

pub use self::core::{
    AsyncConfig, AsyncDispatcher, AsyncEntry, EnqueueOutcome, ErrorCallback, Formatter,
    JsonFormatter, LogLevel, LogOutcome, LogRecord, Logger, LoggerBuilder, LoggerConfig,
    LoggerError, LoggerMetrics, OverflowCallback, OverflowPolicy, PatternFormatter, Registry,
    Rejection, Result, Sink, SinkChain, SourceLocation, TimestampFormat, DEFAULT_PATTERN,
    DEFAULT_LOGGER_NAME, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use self::core::global::{
    critical, debug, default_logger, error, flush, info, log, set_level, trace, warn,
};
pub use sinks::{
    ConsoleSink, ConsoleTarget, FileSink, FileSinkBuilder, FileSinkConfig, FlushPolicy, NullSink,
};
