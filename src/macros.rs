//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. The level is
//! checked before the arguments are formatted, and the call site is
//! attached to the record for the `{source}` placeholder.
//!
//! # Examples
//!
//! ```
//! use rust_channel_logger::prelude::*;
//! use rust_channel_logger::info;
//! use std::sync::Arc;
//!
//! let logger = Logger::new("server", LogLevel::Info, vec![Arc::new(NullSink::new())]).unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message with automatic formatting.
///
/// Evaluates to the call's [`LogOutcome`](crate::LogOutcome).
///
/// # Examples
///
/// ```
/// # use rust_channel_logger::prelude::*;
/// # let logger = Logger::new("app", LogLevel::Info, Vec::new()).unwrap();
/// use rust_channel_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// assert_eq!(log!(logger, LogLevel::Debug, "hidden"), LogOutcome::Filtered);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.should_log(level) {
            logger.log_at(
                level,
                $crate::SourceLocation::new(file!(), line!(), module_path!()),
                format!($($arg)+),
            )
        } else {
            $crate::LogOutcome::Filtered
        }
    }};
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_channel_logger::prelude::*;
/// # let logger = Logger::new("app", LogLevel::Trace, Vec::new()).unwrap();
/// use rust_channel_logger::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_channel_logger::prelude::*;
/// # let logger = Logger::new("app", LogLevel::Info, Vec::new()).unwrap();
/// use rust_channel_logger::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_channel_logger::prelude::*;
/// # let logger = Logger::new("app", LogLevel::Info, Vec::new()).unwrap();
/// use rust_channel_logger::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, LogOutcome, LogRecord, Logger, Result, Sink};
    use parking_lot::Mutex;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct LineSink {
        lines: Mutex<Vec<String>>,
    }

    impl Sink for LineSink {
        fn write(&self, formatted: &[u8], _record: &LogRecord) -> Result<()> {
            self.lines
                .lock()
                .push(String::from_utf8_lossy(formatted).trim_end().to_string());
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "lines"
        }
    }

    /// Counts how often it is rendered
    struct Expensive<'a>(&'a AtomicUsize);

    impl fmt::Display for Expensive<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.fetch_add(1, Ordering::SeqCst);
            write!(f, "expensive")
        }
    }

    fn logger(level: LogLevel) -> (Logger, Arc<LineSink>) {
        let sink = Arc::new(LineSink::default());
        let logger = Logger::builder("macros")
            .level(level)
            .pattern("{level} {message} {source}")
            .sink(sink.clone())
            .build()
            .unwrap();
        (logger, sink)
    }

    #[test]
    fn test_every_level_macro() {
        let (logger, sink) = logger(LogLevel::Trace);
        trace!(logger, "t {}", 1);
        debug!(logger, "d {}", 2);
        info!(logger, "i {}", 3);
        warn!(logger, "w {}", 4);
        error!(logger, "e {}", 5);
        critical!(logger, "c {}", 6);
        log!(logger, LogLevel::Info, "plain");

        let lines = sink.lines.lock();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("TRACE t 1 "));
        assert!(lines[5].starts_with("CRITICAL c 6 "));
        assert!(lines[6].starts_with("INFO plain "));
    }

    #[test]
    fn test_filtered_arguments_are_not_formatted() {
        let (logger, sink) = logger(LogLevel::Warn);
        let renders = AtomicUsize::new(0);

        assert_eq!(debug!(logger, "{}", Expensive(&renders)), LogOutcome::Filtered);
        assert_eq!(renders.load(Ordering::SeqCst), 0);

        assert_eq!(warn!(logger, "{}", Expensive(&renders)), LogOutcome::Written);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(sink.lines.lock().len(), 1);
    }

    #[test]
    fn test_macro_captures_call_site() {
        let (logger, sink) = logger(LogLevel::Info);
        let line = line!() + 1;
        info!(logger, "here");

        let expected = format!("INFO here {}:{}", file!(), line);
        assert_eq!(sink.lines.lock()[0], expected);
    }

    #[test]
    fn test_macro_accepts_shared_logger() {
        let (logger, sink) = logger(LogLevel::Info);
        let shared = Arc::new(logger);
        info!(shared, "via arc");
        assert_eq!(sink.lines.lock().len(), 1);
    }
}
