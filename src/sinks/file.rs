//! File sink implementation
//!
//! Appends rendered lines to a file through an in-memory buffer. A single
//! lock guards the file handle and the buffer, so concurrent writers never
//! interleave partial records.

use crate::core::{LogLevel, LogRecord, LoggerError, Result, Sink};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Buffered bytes that force a physical write regardless of policy
pub const MAX_BUFFERED_BYTES: usize = 1024 * 1024;

/// Attempts for transient (`WouldBlock`, `TimedOut`) write errors
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// When buffered bytes are written to the file
///
/// # Examples
///
/// ```
/// use rust_channel_logger::{FlushPolicy, LogLevel};
///
/// // Strongest durability, lowest throughput (default)
/// let policy = FlushPolicy::EveryRecord;
///
/// // Write once 64 KiB are buffered, or immediately for errors
/// let policy = FlushPolicy::Hybrid { bytes: 64 * 1024, level: LogLevel::Error };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlushPolicy {
    /// Write through after every record
    #[default]
    EveryRecord,

    /// Write once the buffer holds at least this many bytes
    ByteThreshold(usize),

    /// Write when a record at or above this level arrives
    LevelThreshold(LogLevel),

    /// Write on whichever of the two thresholds is reached first
    Hybrid { bytes: usize, level: LogLevel },
}

impl FlushPolicy {
    #[must_use]
    pub fn should_flush(&self, buffered: usize, level: LogLevel) -> bool {
        match *self {
            FlushPolicy::EveryRecord => true,
            FlushPolicy::ByteThreshold(bytes) => buffered >= bytes,
            FlushPolicy::LevelThreshold(threshold) => level >= threshold,
            FlushPolicy::Hybrid {
                bytes,
                level: threshold,
            } => buffered >= bytes || level >= threshold,
        }
    }
}

/// Serializable file sink settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub path: PathBuf,
    pub flush_policy: FlushPolicy,
    pub truncate: bool,
    pub create_dirs: bool,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/app.log"),
            flush_policy: FlushPolicy::default(),
            truncate: false,
            create_dirs: true,
        }
    }
}

struct FileState {
    file: File,
    buffer: Vec<u8>,
}

pub struct FileSink {
    path: PathBuf,
    state: Mutex<FileState>,
    policy: FlushPolicy,
    error_count: AtomicU64,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed
    ///
    /// Fails immediately if the file cannot be opened.
    pub fn new(path: impl Into<PathBuf>, policy: FlushPolicy) -> Result<Self> {
        Self::builder(path).flush_policy(policy).build()
    }

    pub fn builder(path: impl Into<PathBuf>) -> FileSinkBuilder {
        FileSinkBuilder::new(path)
    }

    pub fn from_config(config: &FileSinkConfig) -> Result<Self> {
        Self::builder(config.path.clone())
            .flush_policy(config.flush_policy)
            .truncate(config.truncate)
            .create_dirs(config.create_dirs)
            .build()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        self.policy
    }

    /// Writes or flushes that failed terminally
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Bytes accepted but not yet written to the file
    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Move the buffer into the file; on a terminal error the bytes are
    /// discarded
    fn write_buffer(&self, state: &mut FileState) -> Result<()> {
        if state.buffer.is_empty() {
            return Ok(());
        }
        let result = write_with_retry(&mut state.file, &state.buffer);
        state.buffer.clear();
        result.map_err(|e| self.io_failure("writing log file", e))
    }

    fn io_failure(&self, operation: &str, source: io::Error) -> LoggerError {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        LoggerError::io_operation(operation, self.path.display().to_string(), source)
    }
}

impl Sink for FileSink {
    fn write(&self, formatted: &[u8], record: &LogRecord) -> Result<()> {
        let mut state = self.state.lock();
        state.buffer.extend_from_slice(formatted);

        let buffered = state.buffer.len();
        if buffered >= MAX_BUFFERED_BYTES || self.policy.should_flush(buffered, record.level) {
            self.write_buffer(&mut state)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.write_buffer(&mut state)?;
        state
            .file
            .flush()
            .map_err(|e| self.io_failure("flushing log file", e))?;
        state
            .file
            .sync_data()
            .map_err(|e| self.io_failure("syncing log file", e))
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("error_count", &self.error_count())
            .finish()
    }
}

/// Write all of `buf`, retrying partial writes
///
/// `Interrupted` retries for free; `WouldBlock` and `TimedOut` are retried
/// up to [`MAX_WRITE_ATTEMPTS`] times; anything else is terminal.
fn write_with_retry<W: Write>(writer: &mut W, mut buf: &[u8]) -> io::Result<()> {
    let mut attempts = 0;
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e)
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
                    && attempts + 1 < MAX_WRITE_ATTEMPTS =>
            {
                attempts += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Builder for [`FileSink`]
///
/// # Example
///
/// ```no_run
/// use rust_channel_logger::{FileSink, FlushPolicy};
///
/// let sink = FileSink::builder("logs/app.log")
///     .flush_policy(FlushPolicy::ByteThreshold(32 * 1024))
///     .create_dirs(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileSinkBuilder {
    path: PathBuf,
    policy: FlushPolicy,
    truncate: bool,
    create_dirs: bool,
}

impl FileSinkBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: FlushPolicy::default(),
            truncate: false,
            create_dirs: false,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Empty the file on open instead of appending to existing content
    #[must_use = "builder methods return a new value"]
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Create missing parent directories on open
    #[must_use = "builder methods return a new value"]
    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    pub fn build(self) -> Result<FileSink> {
        let display = self.path.display().to_string();
        let open_error = |e: io::Error| LoggerError::file_sink(&display, e.to_string());

        if self.create_dirs {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(open_error)?;
            }
        }
        if self.truncate {
            File::create(&self.path).map_err(open_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(open_error)?;

        Ok(FileSink {
            path: self.path,
            state: Mutex::new(FileState {
                file,
                buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
            }),
            policy: self.policy,
            error_count: AtomicU64::new(0),
        })
    }
}
