//! Bounded multi-producer queue feeding the async worker
//!
//! A ring buffer (`VecDeque`) behind a `parking_lot::Mutex` with one
//! condition variable per direction. Capacity only counts data items;
//! control items (flush barriers) are always accepted while the queue is
//! open so a flush can never be dropped by an overflow policy.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Instant;

/// Result of a push attempt; rejected items are handed back
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Push<T> {
    Queued,
    /// Queued after evicting the returned oldest data item
    Evicted(T),
    /// No room (or the deadline passed)
    Full(T),
    Closed(T),
}

struct Slot<T> {
    item: T,
    counted: bool,
}

struct State<T> {
    slots: VecDeque<Slot<T>>,
    data_len: usize,
    closed: bool,
}

pub(crate) struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                slots: VecDeque::with_capacity(capacity),
                data_len: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued data items
    pub(crate) fn len(&self) -> usize {
        self.state.lock().data_len
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn enqueue(&self, state: &mut State<T>, item: T, counted: bool) {
        state.slots.push_back(Slot { item, counted });
        if counted {
            state.data_len += 1;
        }
        self.not_empty.notify_one();
    }

    pub(crate) fn try_push(&self, item: T) -> Push<T> {
        let mut state = self.state.lock();
        if state.closed {
            return Push::Closed(item);
        }
        if state.data_len >= self.capacity {
            return Push::Full(item);
        }
        self.enqueue(&mut state, item, true);
        Push::Queued
    }

    /// Wait for room, up to `deadline` when given
    ///
    /// The flag reports whether the caller had to wait.
    pub(crate) fn push_blocking(&self, item: T, deadline: Option<Instant>) -> (Push<T>, bool) {
        let mut state = self.state.lock();
        let mut waited = false;

        while !state.closed && state.data_len >= self.capacity {
            waited = true;
            match deadline {
                Some(deadline) => {
                    if self.not_full.wait_until(&mut state, deadline).timed_out()
                        && !state.closed
                        && state.data_len >= self.capacity
                    {
                        return (Push::Full(item), waited);
                    }
                }
                None => self.not_full.wait(&mut state),
            }
        }

        if state.closed {
            return (Push::Closed(item), waited);
        }
        self.enqueue(&mut state, item, true);
        (Push::Queued, waited)
    }

    /// Push, evicting the oldest data item when full
    pub(crate) fn push_evicting(&self, item: T) -> Push<T> {
        let mut state = self.state.lock();
        if state.closed {
            return Push::Closed(item);
        }

        let mut evicted = None;
        if state.data_len >= self.capacity {
            if let Some(pos) = state.slots.iter().position(|slot| slot.counted) {
                evicted = state.slots.remove(pos).map(|slot| slot.item);
                state.data_len -= 1;
            }
        }

        if state.data_len >= self.capacity {
            // Zero capacity: nothing could be evicted to make room.
            return Push::Full(item);
        }
        self.enqueue(&mut state, item, true);
        match evicted {
            Some(old) => Push::Evicted(old),
            None => Push::Queued,
        }
    }

    /// Push a control item, ignoring capacity
    pub(crate) fn push_control(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(item);
        }
        self.enqueue(&mut state, item, false);
        Ok(())
    }

    /// Block until items are available, then move up to `max` into `out`
    ///
    /// `out` must be empty on entry; the worker drains it after every call.
    /// Returns `false` once the queue is closed and fully drained.
    pub(crate) fn pop_batch(&self, out: &mut Vec<T>, max: usize) -> bool {
        let mut state = self.state.lock();
        while state.slots.is_empty() {
            if state.closed {
                return false;
            }
            self.not_empty.wait(&mut state);
        }

        let mut freed = false;
        while out.len() < max {
            let Some(slot) = state.slots.pop_front() else {
                break;
            };
            if slot.counted {
                state.data_len -= 1;
                freed = true;
            }
            out.push(slot.item);
        }

        if freed {
            self.not_full.notify_all();
        }
        true
    }

    /// Reject further pushes and wake every waiter; queued items stay
    /// available to `pop_batch`
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    #[cfg(test)]
    fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.data_len = 0;
        state.slots.drain(..).map(|slot| slot.item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_try_push_respects_capacity() {
        let queue = BoundedQueue::new(2);
        assert_eq!(queue.try_push(1), Push::Queued);
        assert_eq!(queue.try_push(2), Push::Queued);
        assert_eq!(queue.try_push(3), Push::Full(3));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drop_oldest_keeps_most_recent() {
        let capacity = 4;
        let extra = 6;
        let queue = BoundedQueue::new(capacity);
        let mut evicted = Vec::new();

        for i in 0..capacity + extra {
            match queue.push_evicting(i) {
                Push::Queued => {}
                Push::Evicted(old) => evicted.push(old),
                other => panic!("unexpected push result: {:?}", other),
            }
        }

        assert_eq!(queue.drain(), vec![6, 7, 8, 9]);
        assert_eq!(evicted, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_eviction_skips_control_items() {
        let queue = BoundedQueue::new(1);
        assert_eq!(queue.push_control(-1), Ok(()));
        assert_eq!(queue.push_evicting(1), Push::Queued);
        assert_eq!(queue.push_evicting(2), Push::Evicted(1));
        assert_eq!(queue.drain(), vec![-1, 2]);
    }

    #[test]
    fn test_control_items_bypass_capacity() {
        let queue = BoundedQueue::new(1);
        assert_eq!(queue.try_push(1), Push::Queued);
        assert_eq!(queue.push_control(2), Ok(()));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_blocking_push_times_out() {
        let queue = BoundedQueue::new(1);
        assert_eq!(queue.try_push(1), Push::Queued);
        let deadline = Instant::now() + Duration::from_millis(20);
        let (result, waited) = queue.push_blocking(2, Some(deadline));
        assert_eq!(result, Push::Full(2));
        assert!(waited);
    }

    #[test]
    fn test_blocking_push_wakes_when_consumer_pops() {
        let queue = Arc::new(BoundedQueue::new(1));
        assert_eq!(queue.try_push(1), Push::Queued);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push_blocking(2, None))
        };

        thread::sleep(Duration::from_millis(20));
        let mut out = Vec::new();
        assert!(queue.pop_batch(&mut out, 10));
        assert_eq!(out, vec![1]);

        let (result, _) = producer.join().unwrap();
        assert_eq!(result, Push::Queued);
    }

    #[test]
    fn test_close_wakes_blocked_producer() {
        let queue = Arc::new(BoundedQueue::new(1));
        assert_eq!(queue.try_push(1), Push::Queued);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push_blocking(2, None))
        };

        thread::sleep(Duration::from_millis(20));
        queue.close();
        let (result, _) = producer.join().unwrap();
        assert_eq!(result, Push::Closed(2));
    }

    #[test]
    fn test_close_drains_remaining_items() {
        let queue = BoundedQueue::new(8);
        for i in 0..3 {
            assert_eq!(queue.try_push(i), Push::Queued);
        }
        queue.close();
        assert_eq!(queue.try_push(9), Push::Closed(9));
        assert_eq!(queue.push_control(9), Err(9));

        let mut out = Vec::new();
        assert!(queue.pop_batch(&mut out, 2));
        assert_eq!(out.drain(..).collect::<Vec<_>>(), vec![0, 1]);
        assert!(queue.pop_batch(&mut out, 2));
        assert_eq!(out.drain(..).collect::<Vec<_>>(), vec![2]);
        assert!(!queue.pop_batch(&mut out, 2));
        assert!(out.is_empty());
    }

    #[test]
    fn test_pop_batch_reports_end_only_when_closed_and_empty() {
        let queue = BoundedQueue::new(4);
        assert_eq!(queue.try_push(1), Push::Queued);
        assert_eq!(queue.push_control(2), Ok(()));
        queue.close();

        let mut out = Vec::new();
        assert!(queue.pop_batch(&mut out, 1));
        assert_eq!(out, vec![1]);
        out.clear();
        assert!(queue.pop_batch(&mut out, 1));
        assert_eq!(out, vec![2]);
        out.clear();
        assert!(!queue.pop_batch(&mut out, 1));
        assert!(!queue.pop_batch(&mut out, 1));
    }
}
