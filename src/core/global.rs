//! Logging through the default logger of [`Registry::global`]
//!
//! Every registry starts with a stdout console logger at `Info`, so these
//! work without any setup:
//!
//! ```
//! use rust_channel_logger::{info, LogOutcome};
//!
//! assert_eq!(info("no setup needed"), LogOutcome::Written);
//! ```
//!
//! Install another logger with [`Registry::set_default_logger`] on the
//! global registry to redirect them.

use super::{
    error::Result,
    log_level::LogLevel,
    logger::{LogOutcome, Logger, Rejection},
    registry::Registry,
};
use std::sync::Arc;

/// The global registry's default logger
pub fn default_logger() -> Option<Arc<Logger>> {
    Registry::global().default_logger()
}

pub fn log(level: LogLevel, message: impl Into<String>) -> LogOutcome {
    log_to_default(Registry::global(), level, message)
}

pub fn trace(message: impl Into<String>) -> LogOutcome {
    log(LogLevel::Trace, message)
}

pub fn debug(message: impl Into<String>) -> LogOutcome {
    log(LogLevel::Debug, message)
}

pub fn info(message: impl Into<String>) -> LogOutcome {
    log(LogLevel::Info, message)
}

pub fn warn(message: impl Into<String>) -> LogOutcome {
    log(LogLevel::Warn, message)
}

pub fn error(message: impl Into<String>) -> LogOutcome {
    log(LogLevel::Error, message)
}

pub fn critical(message: impl Into<String>) -> LogOutcome {
    log(LogLevel::Critical, message)
}

/// Change the default logger's level; no-op without a default logger
pub fn set_level(level: LogLevel) {
    if let Some(logger) = default_logger() {
        logger.set_level(level);
    }
}

pub fn flush() -> Result<()> {
    match default_logger() {
        Some(logger) => logger.flush(),
        None => Ok(()),
    }
}

fn log_to_default(registry: &Registry, level: LogLevel, message: impl Into<String>) -> LogOutcome {
    match registry.default_logger() {
        Some(logger) => logger.log(level, message),
        None if registry.is_closed() => LogOutcome::Rejected(Rejection::RegistryClosed),
        // Default removed by name: nowhere to deliver
        None => LogOutcome::Filtered,
    }
}
