//! Log record structure

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::sync::Arc;

// Computed once per thread; `std::thread::current()` is not free.
thread_local! {
    static THREAD_INFO: (String, Option<String>) = {
        let current = std::thread::current();
        let id: String = format!("{:?}", current.id())
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        (id, current.name().map(|name| escape_line_breaks(name.to_string())))
    };
}

fn current_thread_info() -> (String, Option<String>) {
    THREAD_INFO.with(|info| info.clone())
}

/// Call-site location captured by the logging macros
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub module_path: &'static str,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, module_path: &'static str) -> Self {
        Self {
            file,
            line,
            module_path,
        }
    }
}

/// One log event. Timestamp and thread are captured when the record is
/// built, which is on the producing thread even in async mode.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger_name: Arc<str>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// Sanitize text to prevent log injection attacks
///
/// Replaces newlines, carriage returns, and tabs with escape sequences
/// so one record always renders to one line.
pub(crate) fn escape_line_breaks(text: String) -> String {
    if !text.contains(['\n', '\r', '\t']) {
        return text;
    }
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

impl LogRecord {
    pub fn new(level: LogLevel, logger_name: Arc<str>, message: String) -> Self {
        let (thread_id, thread_name) = current_thread_info();
        Self {
            timestamp: Utc::now(),
            level,
            logger_name,
            thread_id,
            thread_name,
            message: escape_line_breaks(message),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Thread name when the thread has one, otherwise its numeric id
    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}
