//! Built-in sinks

pub mod console;
pub mod file;
pub mod null;

pub use console::{ConsoleSink, ConsoleTarget};
pub use file::{
    FileSink, FileSinkBuilder, FileSinkConfig, FlushPolicy, MAX_BUFFERED_BYTES, MAX_WRITE_ATTEMPTS,
};
pub use null::NullSink;
