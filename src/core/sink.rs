//! Sink trait for log output destinations

use super::{
    error::Result,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    overflow_policy::{ErrorCallback, OverflowCallback},
    LoggerError,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A destination for rendered records
///
/// Sinks are shared between loggers (`Arc<dyn Sink>`) and called from many
/// threads at once, so implementations synchronize internally. Errors
/// returned here never reach the thread that logged: the owning logger
/// counts them and forwards them to its error callback.
pub trait Sink: Send + Sync {
    /// Accept one rendered record (already newline-terminated)
    fn write(&self, formatted: &[u8], record: &LogRecord) -> Result<()>;

    /// Push buffered bytes to the destination; must be harmless when idle
    fn flush(&self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Ordered sinks of one logger, plus where their failures are reported
///
/// Used directly by a logger in direct mode and carried with every queued
/// entry in async mode so the worker reports failures to the right logger.
pub struct SinkChain {
    logger_name: Arc<str>,
    sinks: Vec<Arc<dyn Sink>>,
    metrics: Arc<LoggerMetrics>,
    on_error: Option<ErrorCallback>,
    on_overflow: Option<OverflowCallback>,
}

impl SinkChain {
    pub fn new(
        logger_name: Arc<str>,
        sinks: Vec<Arc<dyn Sink>>,
        metrics: Arc<LoggerMetrics>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self {
            logger_name,
            sinks,
            metrics,
            on_error,
            on_overflow: None,
        }
    }

    /// Notify `callback` when the overflow policy discards this chain's records
    #[must_use]
    pub fn with_overflow_callback(mut self, callback: Option<OverflowCallback>) -> Self {
        self.on_overflow = callback;
        self
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn sinks(&self) -> &[Arc<dyn Sink>] {
        &self.sinks
    }

    pub fn metrics(&self) -> &Arc<LoggerMetrics> {
        &self.metrics
    }

    /// Write to every sink in order; a failing sink does not stop the rest
    ///
    /// Returns `true` when every sink accepted the record.
    pub fn write(&self, formatted: &[u8], record: &LogRecord) -> bool {
        let mut ok = true;

        // Per-sink panic isolation: one broken sink must not take the
        // logging thread (or the async worker) down with it.
        for sink in &self.sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.write(formatted, record))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.report(sink.name(), "write", e.to_string());
                    ok = false;
                }
                Err(panic_info) => {
                    self.report(sink.name(), "write", panic_message(panic_info));
                    ok = false;
                }
            }
        }

        if ok {
            self.metrics.record_logged();
        }
        ok
    }

    /// Flush every sink; returns `true` when all succeeded
    pub fn flush(&self) -> bool {
        let mut ok = true;
        for sink in &self.sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.report(sink.name(), "flush", e.to_string());
                    ok = false;
                }
                Err(panic_info) => {
                    self.report(sink.name(), "flush", panic_message(panic_info));
                    ok = false;
                }
            }
        }
        ok
    }

    /// Count a record of this chain lost to the overflow policy
    ///
    /// `evicted` marks a queued record pushed out by a newer one. Alerts on
    /// the first drop and every 1000th after it.
    pub(crate) fn record_drop(&self, evicted: bool) {
        let previous = if evicted {
            self.metrics.record_evicted()
        } else {
            self.metrics.record_dropped()
        };
        let dropped = previous + 1;
        if previous != 0 && dropped % 1000 != 0 {
            return;
        }

        match self.on_overflow {
            Some(ref callback) => {
                let _ = catch_unwind(AssertUnwindSafe(|| callback(dropped)));
            }
            None => eprintln!(
                "[LOGGER WARNING] Logger '{}': async queue full, {} logs dropped. \
                 Consider increasing the queue capacity or using a blocking overflow policy.",
                self.logger_name, dropped
            ),
        }
    }

    fn report(&self, sink: &str, operation: &'static str, message: String) {
        let previous = self.metrics.record_sink_error();
        let error = LoggerError::sink_failure(&*self.logger_name, sink, operation, message);

        match self.on_error {
            Some(ref callback) => {
                // A panicking callback is as harmful as a panicking sink.
                let _ = catch_unwind(AssertUnwindSafe(|| callback(&error)));
            }
            None => {
                // Alert on first failure and periodically thereafter
                if previous == 0 || (previous + 1) % 1000 == 0 {
                    eprintln!("[LOGGER ERROR] {} (total sink errors: {})", error, previous + 1);
                }
            }
        }
    }
}

impl std::fmt::Debug for SinkChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkChain")
            .field("logger_name", &self.logger_name)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked: unknown payload".to_string()
    }
}
