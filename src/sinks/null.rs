//! Sink that discards everything

use crate::core::{LogRecord, Result, Sink};
use std::sync::atomic::{AtomicU64, Ordering};

/// Accepts and discards records, counting them
///
/// Useful for measuring logger overhead without I/O.
#[derive(Debug, Default)]
pub struct NullSink {
    records: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

impl Sink for NullSink {
    fn write(&self, _formatted: &[u8], _record: &LogRecord) -> Result<()> {
        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
