//! Main logger implementation

use super::{
    config::LoggerConfig,
    dispatcher::{AsyncDispatcher, AsyncEntry, EnqueueOutcome, DEFAULT_WORKER_NAME},
    error::{LoggerError, Result},
    formatter::{Formatter, JsonFormatter, PatternFormatter},
    log_level::LogLevel,
    log_record::{LogRecord, SourceLocation},
    metrics::LoggerMetrics,
    overflow_policy::{ErrorCallback, OverflowCallback, OverflowPolicy},
    sink::{Sink, SinkChain},
    timestamp::{is_valid_strftime, TimestampFormat},
};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a dropped logger waits for a shared dispatcher to flush its
/// records before giving up
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const STATE_OPEN: u8 = 0;
const STATE_STOPPED: u8 = 1;
const STATE_REGISTRY_CLOSED: u8 = 2;

/// Why a record was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `Logger::shutdown` was called
    LoggerStopped,
    /// The owning registry was shut down
    RegistryClosed,
    /// The async dispatcher no longer accepts records
    DispatcherStopped,
}

impl From<Rejection> for LoggerError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::LoggerStopped => LoggerError::LoggerStopped,
            Rejection::RegistryClosed => LoggerError::RegistryClosed,
            Rejection::DispatcherStopped => LoggerError::DispatcherStopped,
        }
    }
}

/// What happened to a single log call
///
/// Logging never fails loudly; callers that care inspect the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Below the logger's level; nothing was formatted
    Filtered,
    /// Handed to every sink on the calling thread
    Written,
    /// Accepted by the async dispatcher
    Queued,
    /// Discarded by the dispatcher's overflow policy
    Dropped,
    Rejected(Rejection),
}

impl LogOutcome {
    /// Whether the record was accepted for delivery
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, LogOutcome::Written | LogOutcome::Queued)
    }

    /// Turn a rejection into the matching error
    pub fn into_result(self) -> Result<Self> {
        match self {
            LogOutcome::Rejected(rejection) => Err(rejection.into()),
            outcome => Ok(outcome),
        }
    }
}

/// A named logger routing records to its sinks
///
/// The level check is a single relaxed atomic load, so disabled levels
/// cost almost nothing. Eligible records are rendered once on the calling
/// thread and then either written to the sinks directly or queued on an
/// [`AsyncDispatcher`].
///
/// # Example
///
/// ```
/// use rust_channel_logger::{LogLevel, LogOutcome, Logger, NullSink};
/// use std::sync::Arc;
///
/// let logger = Logger::builder("app")
///     .level(LogLevel::Info)
///     .sink(Arc::new(NullSink::new()))
///     .build()
///     .unwrap();
///
/// assert_eq!(logger.debug("hidden"), LogOutcome::Filtered);
/// assert_eq!(logger.info("started"), LogOutcome::Written);
/// ```
pub struct Logger {
    name: Arc<str>,
    level: AtomicU8,
    formatter: Arc<dyn Formatter>,
    chain: Arc<SinkChain>,
    dispatcher: Option<Arc<AsyncDispatcher>>,
    owns_dispatcher: bool,
    metrics: Arc<LoggerMetrics>,
    state: AtomicU8,
}

impl Logger {
    /// Direct-mode logger with the default pattern
    pub fn new(name: impl Into<String>, level: LogLevel, sinks: Vec<Arc<dyn Sink>>) -> Result<Self> {
        LoggerBuilder::new(name).level(level).sinks(sinks).build()
    }

    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a record at `level` would be emitted
    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        let min = self.level.load(Ordering::Relaxed);
        level.as_u8() >= min && level != LogLevel::Off
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Change the threshold; other threads observe it eventually
    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> LogOutcome {
        if !self.should_log(level) {
            return LogOutcome::Filtered;
        }
        self.submit(LogRecord::new(level, Arc::clone(&self.name), message.into()))
    }

    /// Log with the call site attached
    pub fn log_at(
        &self,
        level: LogLevel,
        location: SourceLocation,
        message: impl Into<String>,
    ) -> LogOutcome {
        if !self.should_log(level) {
            return LogOutcome::Filtered;
        }
        let record = LogRecord::new(level, Arc::clone(&self.name), message.into());
        self.submit(record.with_location(location))
    }

    /// Log pre-captured format arguments; they are only rendered when the
    /// level is enabled
    pub fn log_args(&self, level: LogLevel, args: fmt::Arguments<'_>) -> LogOutcome {
        if !self.should_log(level) {
            return LogOutcome::Filtered;
        }
        self.submit(LogRecord::new(level, Arc::clone(&self.name), fmt::format(args)))
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) -> LogOutcome {
        self.log(LogLevel::Trace, message)
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) -> LogOutcome {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) -> LogOutcome {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) -> LogOutcome {
        self.log(LogLevel::Warn, message)
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) -> LogOutcome {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) -> LogOutcome {
        self.log(LogLevel::Critical, message)
    }

    fn rejection(&self) -> Option<Rejection> {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => None,
            STATE_STOPPED => Some(Rejection::LoggerStopped),
            _ => Some(Rejection::RegistryClosed),
        }
    }

    fn submit(&self, record: LogRecord) -> LogOutcome {
        if let Some(rejection) = self.rejection() {
            return LogOutcome::Rejected(rejection);
        }

        let mut payload = Vec::with_capacity(record.message.len() + 96);
        self.formatter.format(&record, &mut payload);

        let Some(ref dispatcher) = self.dispatcher else {
            self.chain.write(&payload, &record);
            return LogOutcome::Written;
        };

        let entry = AsyncEntry {
            record,
            payload,
            chain: Arc::clone(&self.chain),
        };
        match dispatcher.enqueue(entry) {
            EnqueueOutcome::Queued | EnqueueOutcome::Evicted => LogOutcome::Queued,
            EnqueueOutcome::Dropped => LogOutcome::Dropped,
            EnqueueOutcome::Stopped => LogOutcome::Rejected(
                self.rejection().unwrap_or(Rejection::DispatcherStopped),
            ),
        }
    }

    /// Make everything logged so far reach the sinks, then flush them
    ///
    /// In async mode this waits for the worker to process every record
    /// queued before the call. Sink flush failures are reported through
    /// the error callback and metrics rather than returned.
    pub fn flush(&self) -> Result<()> {
        match self.dispatcher {
            Some(ref dispatcher) => self.settle_flush(dispatcher.flush(&self.chain)),
            None => {
                self.chain.flush();
                Ok(())
            }
        }
    }

    /// Like [`flush`](Self::flush) but gives up with
    /// [`LoggerError::FlushIncomplete`] after `timeout`
    pub fn flush_timeout(&self, timeout: Duration) -> Result<()> {
        match self.dispatcher {
            Some(ref dispatcher) => {
                self.settle_flush(dispatcher.flush_timeout(&self.chain, timeout))
            }
            None => {
                self.chain.flush();
                Ok(())
            }
        }
    }

    // A stopped dispatcher has already drained its queue.
    fn settle_flush(&self, result: Result<()>) -> Result<()> {
        match result {
            Err(LoggerError::DispatcherStopped) => {
                self.chain.flush();
                Ok(())
            }
            other => other,
        }
    }

    /// Refuse new records, deliver the queued ones and flush every sink
    ///
    /// An owned dispatcher is drained and stopped; a shared one keeps
    /// running for its other loggers. Safe to call more than once.
    pub fn shutdown(&self) -> Result<()> {
        let _ = self.state.compare_exchange(
            STATE_OPEN,
            STATE_STOPPED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        match self.dispatcher {
            Some(ref dispatcher) if self.owns_dispatcher => {
                dispatcher.shutdown();
                self.chain.flush();
                Ok(())
            }
            _ => self.flush(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.load(Ordering::Acquire) != STATE_OPEN
    }

    /// Mark the logger closed by its registry; the registry then drains
    /// the dispatcher
    pub(crate) fn close_for_registry(&self) {
        self.state.store(STATE_REGISTRY_CLOSED, Ordering::Release);
    }

    pub(crate) fn dispatcher(&self) -> Option<&Arc<AsyncDispatcher>> {
        self.dispatcher.as_ref()
    }

    pub(crate) fn flush_sinks(&self) {
        self.chain.flush();
    }

    pub fn is_async(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Per-logger counters: delivered, dropped, evicted, sink errors
    ///
    /// # Example
    ///
    /// ```
    /// use rust_channel_logger::{Logger, NullSink};
    /// use std::sync::Arc;
    ///
    /// let logger = Logger::builder("app")
    ///     .sink(Arc::new(NullSink::new()))
    ///     .build()
    ///     .unwrap();
    ///
    /// logger.info("hello");
    /// let metrics = logger.metrics();
    /// println!("Dropped: {}", metrics.dropped_count());
    /// println!("Total logged: {}", metrics.total_logged());
    /// println!("Drop rate: {:.2}%", metrics.drop_rate());
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn sinks(&self) -> &[Arc<dyn Sink>] {
        self.chain.sinks()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        match self.dispatcher {
            Some(ref dispatcher) if self.owns_dispatcher => {
                dispatcher.shutdown();
            }
            Some(ref dispatcher) => {
                if let Err(e) = dispatcher.flush_timeout(&self.chain, DEFAULT_SHUTDOWN_TIMEOUT) {
                    if !e.is_closed() {
                        eprintln!("[LOGGER WARNING] Logger '{}': {}", self.name, e);
                    }
                }
            }
            None => {}
        }
        self.chain.flush();

        // Report any dropped logs
        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down with {} dropped logs (drop rate: {:.2}%)",
                self.name,
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("chain", &self.chain)
            .field("async", &self.is_async())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Builder for constructing a [`Logger`] with a fluent API
///
/// # Example
/// ```
/// use rust_channel_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder("worker")
///     .level(LogLevel::Debug)
///     .sink(Arc::new(NullSink::new()))
///     .pattern("{timestamp} {level} {message}")
///     .async_mode(1000)
///     .overflow_policy(OverflowPolicy::DropNewest)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build()
///     .unwrap();
/// assert!(logger.is_async());
/// ```
pub struct LoggerBuilder {
    name: String,
    level: LogLevel,
    sinks: Vec<Arc<dyn Sink>>,
    formatter: Option<Arc<dyn Formatter>>,
    async_capacity: Option<usize>,
    overflow_policy: OverflowPolicy,
    dispatcher: Option<Arc<AsyncDispatcher>>,
    on_overflow: Option<OverflowCallback>,
    on_error: Option<ErrorCallback>,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: LogLevel::default(),
            sinks: Vec::new(),
            formatter: None,
            async_capacity: None,
            overflow_policy: OverflowPolicy::default(),
            dispatcher: None,
            on_overflow: None,
            on_error: None,
        }
    }

    /// Start from serialized settings
    ///
    /// Fails if the configured custom timestamp format is not valid
    /// strftime.
    pub fn from_config(name: impl Into<String>, config: &LoggerConfig) -> Result<Self> {
        if let TimestampFormat::Custom(ref format_str) = config.timestamp_format {
            if !is_valid_strftime(format_str) {
                return Err(LoggerError::config(
                    "LoggerConfig",
                    format!("invalid timestamp format '{}'", format_str),
                ));
            }
        }

        let formatter: Arc<dyn Formatter> = if config.json {
            Arc::new(JsonFormatter::new().with_timestamp_format(config.timestamp_format.clone()))
        } else {
            Arc::new(
                PatternFormatter::new(config.pattern.as_str())
                    .with_timestamp_format(config.timestamp_format.clone()),
            )
        };

        let mut builder = Self::new(name).level(config.level).formatter(formatter);
        if let Some(queue) = config.async_queue {
            builder = builder
                .async_mode(queue.capacity)
                .overflow_policy(queue.overflow_policy);
        }
        Ok(builder)
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Append a sink; sinks receive records in the order they were added
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sinks(mut self, sinks: impl IntoIterator<Item = Arc<dyn Sink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Use a [`PatternFormatter`] with `pattern`
    #[must_use = "builder methods return a new value"]
    pub fn pattern(self, pattern: impl Into<String>) -> Self {
        self.formatter(Arc::new(PatternFormatter::new(pattern)))
    }

    /// Give the logger its own dispatcher with room for `capacity` records
    ///
    /// If not called, the logger writes to its sinks synchronously.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, capacity: usize) -> Self {
        self.async_capacity = Some(capacity);
        self
    }

    /// Overflow policy of the logger's own dispatcher
    ///
    /// # Example
    ///
    /// ```
    /// use rust_channel_logger::prelude::*;
    /// use std::time::Duration;
    ///
    /// let logger = Logger::builder("net")
    ///     .async_mode(100)
    ///     .overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)))
    ///     .build()
    ///     .unwrap();
    /// ```
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Queue records on a dispatcher shared with other loggers
    ///
    /// The dispatcher's own capacity and policy apply, and it keeps
    /// running when this logger is shut down.
    #[must_use = "builder methods return a new value"]
    pub fn dispatcher(mut self, dispatcher: Arc<AsyncDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Called with the logger's total drop count on the first drop and
    /// every 1000th after it
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Called with a [`LoggerError::SinkFailure`] whenever a sink fails
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    pub fn build(self) -> Result<Logger> {
        if self.name.is_empty() {
            return Err(LoggerError::config("LoggerBuilder", "logger name must not be empty"));
        }
        // Names are rendered verbatim; a line break would forge a record.
        if self.name.chars().any(char::is_control) {
            return Err(LoggerError::config(
                "LoggerBuilder",
                format!("logger name {:?} contains control characters", self.name),
            ));
        }

        let (dispatcher, owns_dispatcher) = match (self.dispatcher, self.async_capacity) {
            (Some(_), Some(_)) => {
                return Err(LoggerError::config(
                    "LoggerBuilder",
                    "async_mode and a shared dispatcher are mutually exclusive",
                ))
            }
            (Some(shared), None) => (Some(shared), false),
            (None, Some(capacity)) => {
                let dispatcher =
                    AsyncDispatcher::with_name(capacity, self.overflow_policy, DEFAULT_WORKER_NAME)?;
                (Some(Arc::new(dispatcher)), true)
            }
            (None, None) => (None, false),
        };

        let name: Arc<str> = Arc::from(self.name);
        let metrics = Arc::new(LoggerMetrics::new());
        let chain = Arc::new(SinkChain::new(
            Arc::clone(&name),
            self.sinks,
            Arc::clone(&metrics),
            self.on_error,
        )
        .with_overflow_callback(self.on_overflow));

        Ok(Logger {
            name,
            level: AtomicU8::new(self.level.as_u8()),
            formatter: self
                .formatter
                .unwrap_or_else(|| Arc::new(PatternFormatter::default())),
            chain,
            dispatcher,
            owns_dispatcher,
            metrics,
            state: AtomicU8::new(STATE_OPEN),
        })
    }
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("async_capacity", &self.async_capacity)
            .field("overflow_policy", &self.overflow_policy)
            .finish()
    }
}
