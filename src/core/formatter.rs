//! Record formatters
//!
//! A formatter turns a [`LogRecord`] into the bytes a sink writes. Every
//! formatter here is a pure function of the record: no I/O, no shared
//! mutable state, so one instance is shared across threads.
//!
//! - [`PatternFormatter`]: text lines from a `{placeholder}` pattern (default)
//! - [`JsonFormatter`]: one JSON object per line

use super::log_record::LogRecord;
use super::timestamp::{is_valid_strftime, TimestampFormat};
use std::io::Write;

/// Default pattern: `[2025-01-08T10:30:45.123Z] [app] [INFO] message`
pub const DEFAULT_PATTERN: &str = "[{timestamp}] [{logger}] [{level}] {message}";

/// Renders records into output bytes
pub trait Formatter: Send + Sync {
    /// Append the rendered record, including the trailing newline, to `out`
    fn format(&self, record: &LogRecord, out: &mut Vec<u8>);

    /// Render a record into a fresh buffer
    fn render(&self, record: &LogRecord) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + record.message.len());
        self.format(record, &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Timestamp,
    TimestampWith(String),
    Level,
    Logger,
    Thread,
    ThreadId,
    Message,
    Source,
}

/// Text formatter driven by a pattern string
///
/// Recognized placeholders:
///
/// | Placeholder | Output |
/// |---|---|
/// | `{timestamp}` | timestamp in the configured [`TimestampFormat`] |
/// | `{timestamp:<strftime>}` | timestamp in a custom strftime format |
/// | `{level}` | `TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`, `CRITICAL` |
/// | `{logger}` | logger name |
/// | `{thread}` | thread name, or the thread id for unnamed threads |
/// | `{thread_id}` | numeric thread id |
/// | `{message}` | message text |
/// | `{source}` | `file:line` of the call site, empty when unknown |
///
/// `{{` and `}}` produce literal braces. Anything else, including unknown
/// placeholders and invalid strftime formats, is copied through verbatim.
///
/// # Example
///
/// ```
/// use rust_channel_logger::{Formatter, LogLevel, LogRecord, PatternFormatter};
/// use std::sync::Arc;
///
/// let formatter = PatternFormatter::new("{level} {logger}: {message} {unknown}");
/// let record = LogRecord::new(LogLevel::Warn, Arc::from("db"), "slow query".to_string());
/// assert_eq!(formatter.render(&record), b"WARN db: slow query {unknown}\n");
/// ```
#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    tokens: Vec<Token>,
    timestamp_format: TimestampFormat,
}

impl PatternFormatter {
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let tokens = parse_pattern(&pattern);
        Self {
            pattern,
            tokens,
            timestamp_format: TimestampFormat::default(),
        }
    }

    /// Format used by the bare `{timestamp}` placeholder
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

impl Formatter for PatternFormatter {
    fn format(&self, record: &LogRecord, out: &mut Vec<u8>) {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.extend_from_slice(text.as_bytes()),
                Token::Timestamp => self.timestamp_format.format_into(&record.timestamp, out),
                Token::TimestampWith(format_str) => {
                    let _ = write!(out, "{}", record.timestamp.format(format_str));
                }
                Token::Level => out.extend_from_slice(record.level.to_str().as_bytes()),
                Token::Logger => out.extend_from_slice(record.logger_name.as_bytes()),
                Token::Thread => out.extend_from_slice(record.thread_label().as_bytes()),
                Token::ThreadId => out.extend_from_slice(record.thread_id.as_bytes()),
                Token::Message => out.extend_from_slice(record.message.as_bytes()),
                Token::Source => {
                    if let Some(location) = record.location {
                        let _ = write!(out, "{}:{}", location.file, location.line);
                    }
                }
            }
        }
        out.push(b'\n');
    }
}

fn placeholder(name: &str) -> Option<Token> {
    let token = match name {
        "timestamp" => Token::Timestamp,
        "level" => Token::Level,
        "logger" => Token::Logger,
        "thread" => Token::Thread,
        "thread_id" => Token::ThreadId,
        "message" => Token::Message,
        "source" => Token::Source,
        _ => {
            let format_str = name.strip_prefix("timestamp:")?;
            if format_str.is_empty() || !is_valid_strftime(format_str) {
                return None;
            }
            Token::TimestampWith(format_str.to_string())
        }
    };
    Some(token)
}

fn parse_pattern(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(pos) = rest.find(['{', '}']) {
        literal.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            literal.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            literal.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            literal.push('}');
            rest = &tail[1..];
        } else {
            match tail[1..].find('}') {
                Some(end) => {
                    let name = &tail[1..=end];
                    match placeholder(name) {
                        Some(token) => {
                            if !literal.is_empty() {
                                tokens.push(Token::Literal(std::mem::take(&mut literal)));
                            }
                            tokens.push(token);
                        }
                        None => literal.push_str(&tail[..end + 2]),
                    }
                    rest = &tail[end + 2..];
                }
                None => {
                    // Unclosed brace: the remainder is plain text.
                    literal.push_str(tail);
                    rest = "";
                }
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// JSON lines formatter
///
/// Example: `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","logger":"app","message":"started",...}`
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    timestamp_format: TimestampFormat,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    fn timestamp_value(&self, record: &LogRecord) -> serde_json::Value {
        match self.timestamp_format {
            TimestampFormat::Unix => record.timestamp.timestamp().into(),
            TimestampFormat::UnixMillis => record.timestamp.timestamp_millis().into(),
            TimestampFormat::UnixMicros => record.timestamp.timestamp_micros().into(),
            _ => self.timestamp_format.format(&record.timestamp).into(),
        }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord, out: &mut Vec<u8>) {
        let mut object = serde_json::Map::new();
        object.insert("timestamp".to_string(), self.timestamp_value(record));
        object.insert("level".to_string(), record.level.to_str().into());
        object.insert("logger".to_string(), serde_json::Value::from(&*record.logger_name));
        object.insert("message".to_string(), record.message.as_str().into());
        object.insert("thread_id".to_string(), record.thread_id.as_str().into());
        if let Some(ref name) = record.thread_name {
            object.insert("thread_name".to_string(), name.as_str().into());
        }
        if let Some(location) = record.location {
            object.insert("file".to_string(), location.file.into());
            object.insert("line".to_string(), location.line.into());
            object.insert("module_path".to_string(), location.module_path.into());
        }

        let _ = serde_json::to_writer(&mut *out, &serde_json::Value::Object(object));
        out.push(b'\n');
    }
}
