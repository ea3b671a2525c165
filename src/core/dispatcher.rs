//! Asynchronous dispatch: a bounded queue drained by one worker thread
//!
//! Producers render records on their own thread and enqueue
//! `(record, bytes, sink chain)` entries; the worker forwards them to the
//! chain's sinks in queue order. `flush` is a barrier token travelling
//! through the same queue, so it completes only after everything queued
//! before it has been handed to the sinks.

use super::{
    error::{LoggerError, Result},
    log_record::LogRecord,
    metrics::LoggerMetrics,
    overflow_policy::OverflowPolicy,
    queue::{BoundedQueue, Push},
    sink::SinkChain,
};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default queue capacity in records
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// Default name of the worker thread
pub const DEFAULT_WORKER_NAME: &str = "logger-async-worker";

// Messages taken from the queue per lock acquisition
const WORKER_BATCH_SIZE: usize = 64;

// Exponential spinning up to 2^6 pause hints, then yield
const SPIN_LIMIT: u32 = 6;

/// A rendered record waiting for the worker
pub struct AsyncEntry {
    pub record: LogRecord,
    pub payload: Vec<u8>,
    pub chain: Arc<SinkChain>,
}

enum Message {
    Record(AsyncEntry),
    Barrier {
        chain: Arc<SinkChain>,
        done: Sender<()>,
    },
}

/// What happened to an enqueued entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted
    Queued,
    /// Accepted after evicting the oldest queued record
    Evicted,
    /// Discarded by the overflow policy
    Dropped,
    /// Dispatcher is shut down
    Stopped,
}

/// Bounded queue plus a single consumer thread
///
/// # Example
///
/// ```
/// use rust_channel_logger::{AsyncDispatcher, OverflowPolicy};
///
/// let dispatcher = AsyncDispatcher::new(1024, OverflowPolicy::DropOldest).unwrap();
/// assert_eq!(dispatcher.capacity(), 1024);
/// dispatcher.shutdown();
/// assert!(dispatcher.is_stopped());
/// ```
pub struct AsyncDispatcher {
    queue: Arc<BoundedQueue<Message>>,
    policy: OverflowPolicy,
    metrics: LoggerMetrics,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl AsyncDispatcher {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        Self::with_name(capacity, policy, DEFAULT_WORKER_NAME)
    }

    /// Create a dispatcher whose worker thread carries `name`
    pub fn with_name(capacity: usize, policy: OverflowPolicy, name: &str) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "AsyncDispatcher",
                "queue capacity must be greater than zero",
            ));
        }

        let queue = Arc::new(BoundedQueue::new(capacity));
        let worker_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(&worker_queue))
            .map_err(|e| {
                LoggerError::io_operation("spawning async worker", format!("thread '{}'", name), e)
            })?;

        Ok(Self {
            queue,
            policy,
            metrics: LoggerMetrics::new(),
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Records currently waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stopped(&self) -> bool {
        self.queue.is_closed()
    }

    /// Queue statistics across every logger using this dispatcher
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Queue an entry according to the overflow policy
    ///
    /// Drops and evictions are also recorded on the metrics of the
    /// affected entry's own chain.
    pub fn enqueue(&self, entry: AsyncEntry) -> EnqueueOutcome {
        let message = Message::Record(entry);

        let (result, found_full) = match self.policy {
            OverflowPolicy::Block => self.push_blocking(message, None),
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.push_blocking(message, Some(Instant::now() + timeout))
            }
            OverflowPolicy::DropNewest => {
                let result = self.queue.try_push(message);
                let full = matches!(result, Push::Full(_));
                (result, full)
            }
            OverflowPolicy::DropOldest => {
                let result = self.queue.push_evicting(message);
                let full = matches!(result, Push::Evicted(_) | Push::Full(_));
                (result, full)
            }
            OverflowPolicy::SpinThenBlock(attempts) => match self.spin(message, attempts) {
                (Push::Full(message), _) => {
                    let (result, _) = self.push_blocking(message, None);
                    (result, true)
                }
                other => other,
            },
            OverflowPolicy::SpinThenDrop(attempts) => self.spin(message, attempts),
        };

        if found_full {
            self.metrics.record_queue_full();
        }
        self.settle(result)
    }

    fn push_blocking(&self, message: Message, deadline: Option<Instant>) -> (Push<Message>, bool) {
        let (result, waited) = self.queue.push_blocking(message, deadline);
        if waited {
            self.metrics.record_block();
        }
        (result, waited)
    }

    /// Retry `try_push` with bounded backoff
    fn spin(&self, mut message: Message, attempts: u32) -> (Push<Message>, bool) {
        let mut found_full = false;
        for step in 0..=attempts {
            match self.queue.try_push(message) {
                Push::Full(returned) => {
                    found_full = true;
                    message = returned;
                    if step < attempts {
                        backoff(step);
                    }
                }
                other => return (other, found_full),
            }
        }
        (Push::Full(message), found_full)
    }

    fn settle(&self, result: Push<Message>) -> EnqueueOutcome {
        match result {
            Push::Queued => EnqueueOutcome::Queued,
            Push::Evicted(old) => {
                if let Message::Record(old) = old {
                    old.chain.record_drop(true);
                }
                self.metrics.record_evicted();
                EnqueueOutcome::Evicted
            }
            Push::Full(rejected) => {
                if let Message::Record(rejected) = rejected {
                    rejected.chain.record_drop(false);
                }
                self.metrics.record_dropped();
                EnqueueOutcome::Dropped
            }
            Push::Closed(_) => EnqueueOutcome::Stopped,
        }
    }

    /// Block until every entry queued before this call has been handed to
    /// its sinks, then flush `chain`
    pub fn flush(&self, chain: &Arc<SinkChain>) -> Result<()> {
        self.flush_inner(chain, None)
    }

    /// Like [`flush`](Self::flush) but gives up after `timeout`
    ///
    /// On timeout the barrier stays queued and no data is lost.
    pub fn flush_timeout(&self, chain: &Arc<SinkChain>, timeout: Duration) -> Result<()> {
        self.flush_inner(chain, Some(timeout))
    }

    fn flush_inner(&self, chain: &Arc<SinkChain>, timeout: Option<Duration>) -> Result<()> {
        let (done, signal) = bounded(1);
        self.queue
            .push_control(Message::Barrier {
                chain: Arc::clone(chain),
                done,
            })
            .map_err(|_| LoggerError::DispatcherStopped)?;

        match timeout {
            None => signal.recv().map_err(|_| LoggerError::DispatcherStopped),
            Some(timeout) => match signal.recv_timeout(timeout) {
                Ok(()) => Ok(()),
                Err(RecvTimeoutError::Timeout) => Err(LoggerError::FlushIncomplete { timeout }),
                Err(RecvTimeoutError::Disconnected) => Err(LoggerError::DispatcherStopped),
            },
        }
    }

    /// Stop accepting entries, let the worker drain the queue, join it
    ///
    /// Producers blocked on a full queue wake up with
    /// [`EnqueueOutcome::Stopped`]. Safe to call more than once; returns
    /// `false` if the worker panicked.
    pub fn shutdown(&self) -> bool {
        self.queue.close();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.join() {
                eprintln!("[LOGGER ERROR] Async worker thread panicked during shutdown: {:?}", e);
                return false;
            }
        }
        true
    }
}

impl Drop for AsyncDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AsyncDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDispatcher")
            .field("capacity", &self.capacity())
            .field("policy", &self.policy)
            .field("len", &self.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn backoff(step: u32) {
    if step < SPIN_LIMIT {
        for _ in 0..(1u32 << step) {
            std::hint::spin_loop();
        }
    } else {
        thread::yield_now();
    }
}

fn run_worker(queue: &BoundedQueue<Message>) {
    let mut batch = Vec::with_capacity(WORKER_BATCH_SIZE);

    while queue.pop_batch(&mut batch, WORKER_BATCH_SIZE) {
        for message in batch.drain(..) {
            match message {
                Message::Record(entry) => {
                    entry.chain.write(&entry.payload, &entry.record);
                }
                Message::Barrier { chain, done } => {
                    chain.flush();
                    // The flusher may have timed out and gone away.
                    let _ = done.send(());
                }
            }
        }
    }
}
