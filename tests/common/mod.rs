//! Shared helpers for integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use rust_channel_logger::{LogRecord, Result, Sink};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keeps every rendered line in memory
#[derive(Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
    flushes: AtomicUsize,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Sink for CollectingSink {
    fn write(&self, formatted: &[u8], _record: &LogRecord) -> Result<()> {
        assert_eq!(formatted.last(), Some(&b'\n'), "records must be newline-terminated");
        let line = String::from_utf8_lossy(&formatted[..formatted.len() - 1]).into_owned();
        self.lines.lock().push(line);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}
