//! Process-wide directory of named loggers
//!
//! A [`Registry`] hands out shared [`Logger`]s by name and owns their
//! lifecycle: once [`Registry::shutdown`] runs, every logger it created
//! refuses new records, every async dispatcher is drained, and every sink
//! is flushed.

use super::{
    dispatcher::AsyncDispatcher,
    error::{LoggerError, Result},
    log_level::LogLevel,
    logger::Logger,
    sink::Sink,
};
use crate::sinks::{ConsoleSink, FileSink, FlushPolicy};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

/// Name of the stdout logger every registry starts with as its default
pub const DEFAULT_LOGGER_NAME: &str = "default";

type LoggerMap = HashMap<String, Arc<Logger>>;

struct PeriodicFlusher {
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl PeriodicFlusher {
    fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            eprintln!("[LOGGER ERROR] Periodic flush thread panicked");
        }
    }
}

/// Named logger directory
///
/// # Example
///
/// ```
/// use rust_channel_logger::{LogLevel, NullSink, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let first = registry
///     .get_or_create("app", LogLevel::Info, vec![Arc::new(NullSink::new())])
///     .unwrap();
/// let second = registry.get_or_create("app", LogLevel::Trace, Vec::new()).unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
///
/// registry.shutdown().unwrap();
/// assert!(registry.get_or_create("app", LogLevel::Info, Vec::new()).is_err());
/// ```
pub struct Registry {
    loggers: Arc<RwLock<LoggerMap>>,
    default_logger: RwLock<Option<Arc<Logger>>>,
    closed: AtomicBool,
    flusher: Mutex<Option<PeriodicFlusher>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            loggers: Arc::new(RwLock::new(HashMap::new())),
            default_logger: RwLock::new(console_logger()),
            closed: AtomicBool::new(false),
            flusher: Mutex::new(None),
        }
    }

    /// The process-wide registry, created on first use
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(LoggerError::RegistryClosed)
        } else {
            Ok(())
        }
    }

    /// Return the logger called `name`, creating a direct-mode one if needed
    ///
    /// `default_level` and `default_sinks` only apply to a newly created
    /// logger.
    pub fn get_or_create(
        &self,
        name: &str,
        default_level: LogLevel,
        default_sinks: Vec<Arc<dyn Sink>>,
    ) -> Result<Arc<Logger>> {
        self.get_or_create_with(name, || Logger::new(name, default_level, default_sinks))
    }

    /// Like [`get_or_create`](Self::get_or_create) with a custom constructor
    ///
    /// `create` runs at most once per name, under the registry's write
    /// lock, and must return a logger called `name`.
    pub fn get_or_create_with<F>(&self, name: &str, create: F) -> Result<Arc<Logger>>
    where
        F: FnOnce() -> Result<Logger>,
    {
        self.ensure_open()?;
        if let Some(existing) = self.loggers.read().get(name) {
            return Ok(Arc::clone(existing));
        }

        let mut loggers = self.loggers.write();
        // Shutdown may have won the race for the write lock.
        self.ensure_open()?;
        if let Some(existing) = loggers.get(name) {
            return Ok(Arc::clone(existing));
        }

        let logger = create()?;
        if logger.name() != name {
            return Err(LoggerError::config(
                "Registry",
                format!("constructor for '{}' built logger '{}'", name, logger.name()),
            ));
        }
        let logger = Arc::new(logger);
        loggers.insert(name.to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    /// Add a fully built logger; fails if its name is taken
    pub fn register(&self, logger: Logger) -> Result<Arc<Logger>> {
        let mut loggers = self.loggers.write();
        self.ensure_open()?;
        if loggers.contains_key(logger.name()) {
            return Err(LoggerError::DuplicateLogger(logger.name().to_string()));
        }

        let logger = Arc::new(logger);
        loggers.insert(logger.name().to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    /// File logger at Info level writing through on every record
    pub fn file_logger(&self, name: &str, path: impl Into<PathBuf>) -> Result<Arc<Logger>> {
        let path = path.into();
        self.get_or_create_with(name, || {
            let sink = FileSink::new(path, FlushPolicy::default())?;
            Logger::new(name, LogLevel::Info, vec![Arc::new(sink)])
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers.read().get(name).cloned()
    }

    /// Forget the logger called `name` after flushing it
    ///
    /// Holders of the returned `Arc` can keep using it.
    pub fn remove(&self, name: &str) -> Option<Arc<Logger>> {
        let removed = self.loggers.write().remove(name)?;

        let mut default = self.default_logger.write();
        if default.as_ref().is_some_and(|d| Arc::ptr_eq(d, &removed)) {
            *default = None;
        }
        drop(default);

        if let Err(e) = removed.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush removed logger '{}': {}", name, e);
        }
        Some(removed)
    }

    /// Registered names in sorted order
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the logger returned by [`default_logger`](Self::default_logger)
    ///
    /// The default logger is not required to be registered by name.
    pub fn set_default_logger(&self, logger: Arc<Logger>) -> Result<()> {
        let mut default = self.default_logger.write();
        self.ensure_open()?;
        *default = Some(logger);
        Ok(())
    }

    /// A stdout console logger at `Info` until replaced; `None` after
    /// shutdown or once the installed default was removed by name
    pub fn default_logger(&self) -> Option<Arc<Logger>> {
        self.default_logger.read().clone()
    }

    pub fn set_level_all(&self, level: LogLevel) {
        for logger in self.loggers.read().values() {
            logger.set_level(level);
        }
        if let Some(ref logger) = *self.default_logger.read() {
            logger.set_level(level);
        }
    }

    /// Flush every registered logger; the first failure is returned after
    /// all of them were attempted
    pub fn flush_all(&self) -> Result<()> {
        flush_loggers(&snapshot(&self.loggers))
    }

    /// Flush every registered logger each `interval` on a background
    /// thread until shutdown
    ///
    /// Calling it again replaces the previous interval.
    pub fn flush_every(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(LoggerError::config("Registry", "flush interval must be non-zero"));
        }

        let mut flusher = self.flusher.lock();
        self.ensure_open()?;
        if let Some(previous) = flusher.take() {
            previous.stop();
        }

        let (stop, stopped) = bounded::<()>(1);
        let loggers = Arc::clone(&self.loggers);
        let handle = thread::Builder::new()
            .name("logger-flusher".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = flush_loggers(&snapshot(&loggers)) {
                            eprintln!("[LOGGER ERROR] Periodic flush failed: {}", e);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| {
                LoggerError::io_operation("spawning flusher", "thread 'logger-flusher'", e)
            })?;

        *flusher = Some(PeriodicFlusher { stop, handle });
        Ok(())
    }

    /// Close every logger, drain every dispatcher and flush every sink
    ///
    /// Loggers still held elsewhere report
    /// [`Rejection::RegistryClosed`](super::Rejection::RegistryClosed)
    /// afterwards. A second call returns [`LoggerError::RegistryClosed`].
    pub fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(LoggerError::RegistryClosed);
        }

        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }

        let mut loggers: Vec<Arc<Logger>> =
            self.loggers.write().drain().map(|(_, logger)| logger).collect();
        if let Some(default) = self.default_logger.write().take() {
            if !loggers.iter().any(|l| Arc::ptr_eq(l, &default)) {
                loggers.push(default);
            }
        }

        for logger in &loggers {
            logger.close_for_registry();
        }

        // Dispatchers can be shared; stop each one once.
        let mut dispatchers: Vec<&Arc<AsyncDispatcher>> = Vec::new();
        for dispatcher in loggers.iter().filter_map(|l| l.dispatcher()) {
            if !dispatchers.iter().any(|d| Arc::ptr_eq(d, dispatcher)) {
                dispatchers.push(dispatcher);
            }
        }
        for dispatcher in dispatchers {
            dispatcher.shutdown();
        }

        for logger in &loggers {
            logger.flush_sinks();
        }
        Ok(())
    }
}

// Not registered by name; only reachable through `default_logger`
fn console_logger() -> Option<Arc<Logger>> {
    let stdout: Arc<dyn Sink> = Arc::new(ConsoleSink::stdout());
    Logger::new(DEFAULT_LOGGER_NAME, LogLevel::Info, vec![stdout])
        .ok()
        .map(Arc::new)
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if let Some(flusher) = self.flusher.get_mut().take() {
            flusher.stop();
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("loggers", &self.logger_names())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn snapshot(loggers: &RwLock<LoggerMap>) -> Vec<Arc<Logger>> {
    loggers.read().values().cloned().collect()
}

fn flush_loggers(loggers: &[Arc<Logger>]) -> Result<()> {
    let mut first_error = None;
    for logger in loggers {
        if let Err(e) = logger.flush() {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogOutcome, LogRecord, OverflowPolicy, Rejection};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingSink {
        writes: AtomicUsize,
        flushes: AtomicUsize,
    }

    impl Sink for CountingSink {
        fn write(&self, _formatted: &[u8], _record: &LogRecord) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let registry = Registry::new();
        let a = registry.get_or_create("app", LogLevel::Warn, Vec::new()).unwrap();
        let b = registry.get_or_create("app", LogLevel::Trace, Vec::new()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.level(), LogLevel::Warn);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("app").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_constructor_runs_once_under_contention() {
        let registry = Arc::new(Registry::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let constructions = Arc::clone(&constructions);
                thread::spawn(move || {
                    registry
                        .get_or_create_with("shared", || {
                            constructions.fetch_add(1, Ordering::SeqCst);
                            Logger::builder("shared").async_mode(16).build()
                        })
                        .unwrap()
                })
            })
            .collect();

        let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(loggers.iter().all(|l| Arc::ptr_eq(l, &loggers[0])));
    }

    #[test]
    fn test_constructor_name_must_match() {
        let registry = Registry::new();
        let result = registry.get_or_create_with("a", || Logger::builder("b").build());
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = Registry::new();
        registry.register(Logger::builder("db").build().unwrap()).unwrap();

        let result = registry.register(Logger::builder("db").build().unwrap());
        assert!(matches!(result, Err(LoggerError::DuplicateLogger(ref name)) if name == "db"));
    }

    #[test]
    fn test_remove_flushes_and_forgets() {
        let registry = Registry::new();
        let sink = Arc::new(CountingSink::default());
        let logger = registry
            .get_or_create("tmp", LogLevel::Info, vec![sink.clone() as Arc<dyn Sink>])
            .unwrap();
        registry.set_default_logger(Arc::clone(&logger)).unwrap();

        let removed = registry.remove("tmp").unwrap();
        assert!(Arc::ptr_eq(&removed, &logger));
        assert!(sink.flushes.load(Ordering::SeqCst) >= 1);
        assert!(registry.get("tmp").is_none());
        assert!(registry.default_logger().is_none());
        assert!(registry.remove("tmp").is_none());
    }

    #[test]
    fn test_names_and_levels() {
        let registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.get_or_create(name, LogLevel::Info, Vec::new()).unwrap();
        }
        assert_eq!(registry.logger_names(), vec!["alpha", "mid", "zeta"]);

        registry.set_level_all(LogLevel::Error);
        assert!(registry
            .logger_names()
            .iter()
            .all(|name| registry.get(name).unwrap().level() == LogLevel::Error));
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let registry = Registry::new();
        let sink = Arc::new(CountingSink::default());
        let dispatcher = Arc::new(AsyncDispatcher::new(1024, OverflowPolicy::Block).unwrap());

        let a = registry
            .get_or_create_with("a", || {
                Logger::builder("a")
                    .sink(sink.clone())
                    .dispatcher(Arc::clone(&dispatcher))
                    .build()
            })
            .unwrap();
        let b = registry
            .get_or_create_with("b", || {
                Logger::builder("b")
                    .sink(sink.clone())
                    .dispatcher(Arc::clone(&dispatcher))
                    .build()
            })
            .unwrap();

        for i in 0..100 {
            a.info(format!("a{}", i));
            b.info(format!("b{}", i));
        }

        registry.shutdown().unwrap();
        assert!(registry.is_closed());
        assert!(registry.is_empty());
        assert!(dispatcher.is_stopped());
        assert_eq!(sink.writes.load(Ordering::SeqCst), 200);

        assert_eq!(a.info("late"), LogOutcome::Rejected(Rejection::RegistryClosed));
        assert_eq!(a.debug("late"), LogOutcome::Filtered);
        assert!(matches!(registry.shutdown(), Err(LoggerError::RegistryClosed)));
        assert!(matches!(
            registry.get_or_create("c", LogLevel::Info, Vec::new()),
            Err(LoggerError::RegistryClosed)
        ));
        assert!(registry.register(Logger::builder("d").build().unwrap()).is_err());
    }

    #[test]
    fn test_file_logger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let registry = Registry::new();

        let logger = registry.file_logger("app", &path).unwrap();
        logger.info("to file");
        logger.debug("filtered");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with("[app] [INFO] to file\n"));

        let missing = dir.path().join("missing/dir/app.log");
        assert!(matches!(
            registry.file_logger("broken", missing),
            Err(LoggerError::FileSink { .. })
        ));
    }

    #[test]
    fn test_flush_every_flushes_periodically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("periodic.log");
        let registry = Registry::new();

        let sink = FileSink::new(&path, FlushPolicy::ByteThreshold(1 << 20)).unwrap();
        let logger = registry
            .get_or_create("periodic", LogLevel::Info, vec![Arc::new(sink)])
            .unwrap();
        logger.info("buffered");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        registry.flush_every(Duration::from_millis(10)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while std::fs::read_to_string(&path).unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(std::fs::read_to_string(&path).unwrap().contains("buffered"));

        assert!(registry.flush_every(Duration::ZERO).is_err());
        registry.shutdown().unwrap();
        assert!(registry.flush_every(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_default_logger() {
        let registry = Registry::new();
        let console = registry.default_logger().unwrap();
        assert_eq!(console.name(), DEFAULT_LOGGER_NAME);
        assert_eq!(console.level(), LogLevel::Info);
        assert_eq!(console.sinks()[0].name(), "console");
        assert!(!console.is_async());
        assert!(registry.is_empty());
        assert!(registry.get(DEFAULT_LOGGER_NAME).is_none());

        let logger = Arc::new(Logger::builder("main").build().unwrap());
        registry.set_default_logger(Arc::clone(&logger)).unwrap();
        assert!(Arc::ptr_eq(&registry.default_logger().unwrap(), &logger));

        registry.shutdown().unwrap();
        assert_eq!(logger.info("late"), LogOutcome::Rejected(Rejection::RegistryClosed));
        assert!(registry.set_default_logger(logger).is_err());
        assert!(registry.default_logger().is_none());
        assert_eq!(console.info("late"), LogOutcome::Written);
    }

    #[test]
    fn test_shutdown_closes_builtin_default_logger() {
        let registry = Registry::new();
        let console = registry.default_logger().unwrap();
        registry.shutdown().unwrap();
        assert_eq!(console.info("late"), LogOutcome::Rejected(Rejection::RegistryClosed));
    }

    #[test]
    fn test_global_is_a_singleton() {
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
    }
}
