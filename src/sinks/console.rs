//! Console sink implementation

use crate::core::{LogLevel, LogRecord, Result, Sink};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Which standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
    /// `Error` and `Critical` go to stderr, everything else to stdout
    Split,
}

/// Writes rendered lines to stdout and/or stderr
///
/// The standard stream locks keep concurrent lines whole.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget) -> Self {
        Self { target }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr)
    }

    pub fn split() -> Self {
        Self::new(ConsoleTarget::Split)
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn uses_stderr(&self, level: LogLevel) -> bool {
        match self.target {
            ConsoleTarget::Stdout => false,
            ConsoleTarget::Stderr => true,
            ConsoleTarget::Split => level >= LogLevel::Error,
        }
    }
}

impl Sink for ConsoleSink {
    fn write(&self, formatted: &[u8], record: &LogRecord) -> Result<()> {
        if self.uses_stderr(record.level) {
            io::stderr().lock().write_all(formatted)?;
        } else {
            io::stdout().lock().write_all(formatted)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Flush both since split mode writes to both
        io::stdout().flush()?;
        io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_routes_errors_to_stderr() {
        let sink = ConsoleSink::split();
        assert!(!sink.uses_stderr(LogLevel::Warn));
        assert!(sink.uses_stderr(LogLevel::Error));
        assert!(sink.uses_stderr(LogLevel::Critical));
    }

    #[test]
    fn test_fixed_targets() {
        assert!(!ConsoleSink::stdout().uses_stderr(LogLevel::Critical));
        assert!(ConsoleSink::stderr().uses_stderr(LogLevel::Trace));
        assert_eq!(ConsoleSink::default().target(), ConsoleTarget::Stdout);
    }
}
