//! Overflow policies for the async dispatch queue
//!
//! When the async queue is full, the dispatcher's policy decides what a
//! producer does with its record. The policy is fixed per dispatcher.

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling a full async queue
///
/// # Example
///
/// ```
/// use rust_channel_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: wait for space
/// assert_eq!(OverflowPolicy::default(), OverflowPolicy::Block);
///
/// // Wait up to 50ms, then drop
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverflowPolicy {
    /// Block until space is available
    ///
    /// No record is lost; producers feel backpressure.
    #[default]
    Block,

    /// Block with timeout, then drop the incoming record
    BlockWithTimeout(Duration),

    /// Drop the incoming record when the queue is full
    DropNewest,

    /// Evict the oldest queued record to make room for the incoming one
    ///
    /// Flush barriers are never evicted.
    DropOldest,

    /// Retry with bounded backoff this many times, then block
    SpinThenBlock(u32),

    /// Retry with bounded backoff this many times, then drop the incoming record
    SpinThenDrop(u32),
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::SpinThenBlock(n) => write!(f, "SpinThenBlock({})", n),
            OverflowPolicy::SpinThenDrop(n) => write!(f, "SpinThenDrop({})", n),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when records are dropped due to queue overflow.
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Callback type for sink failures
///
/// Receives a [`LoggerError::SinkFailure`] naming the logger and sink.
pub type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::Block);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "BlockWithTimeout(100ms)"
        );
        assert_eq!(OverflowPolicy::SpinThenDrop(8).to_string(), "SpinThenDrop(8)");
    }

    #[test]
    fn test_serde_roundtrip() {
        let policy = OverflowPolicy::SpinThenDrop(16);
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(serde_json::from_str::<OverflowPolicy>(&json).unwrap(), policy);

        let policy: OverflowPolicy = serde_json::from_str("\"DropOldest\"").unwrap();
        assert_eq!(policy, OverflowPolicy::DropOldest);
    }
}
