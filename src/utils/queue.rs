//! Thread-safe double-ended queue.
//!
//! [`TsDeque`] is the one synchronization primitive between the I/O thread
//! and the application thread: every connection's outbound buffer is one,
//! and each server/client's shared inbound mailbox is one. Whole-queue
//! locking, no capacity bound, producers never block; only [`TsDeque::wait`]
//! blocks, and only the caller's thread.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Mutex/condvar-guarded deque.
pub struct TsDeque<T> {
    items: Mutex<VecDeque<T>>,
    signal: Condvar,
}

impl<T> TsDeque<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            signal: Condvar::new(),
        }
    }

    // A poisoned lock only means another thread panicked mid-operation;
    // the deque itself stays structurally sound, so recover the guard.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the tail and wake one waiter.
    pub fn push_back(&self, item: T) {
        self.lock().push_back(item);
        self.signal.notify_one();
    }

    /// Prepend to the head and wake one waiter.
    pub fn push_front(&self, item: T) {
        self.lock().push_front(item);
        self.signal.notify_one();
    }

    /// Remove and return the head, if any.
    pub fn pop_front(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove and return the tail, if any.
    pub fn pop_back(&self) -> Option<T> {
        self.lock().pop_back()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Block the calling thread until the queue is non-empty.
    ///
    /// Re-checks after every wake, so spurious wakeups are harmless.
    pub fn wait(&self) {
        let mut items = self.lock();
        while items.is_empty() {
            items = self
                .signal
                .wait(items)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<T: Clone> TsDeque<T> {
    /// Clone of the head element, if any.
    pub fn front(&self) -> Option<T> {
        self.lock().front().cloned()
    }

    /// Clone of the tail element, if any.
    pub fn back(&self) -> Option<T> {
        self.lock().back().cloned()
    }
}

impl<T> Default for TsDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn fifo_through_the_back() {
        let q = TsDeque::new();
        q.push_back(1);
        q.push_back(2);
        q.push_back(3);

        assert_eq!(q.len(), 3);
        assert_eq!(q.front(), Some(1));
        assert_eq!(q.back(), Some(3));

        assert_eq!(q.pop_front(), Some(1));
        assert_eq!(q.pop_front(), Some(2));
        assert_eq!(q.pop_front(), Some(3));
        assert_eq!(q.pop_front(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn both_ends_work() {
        let q = TsDeque::new();
        q.push_back(2);
        q.push_front(1);
        q.push_back(3);

        assert_eq!(q.pop_back(), Some(3));
        assert_eq!(q.pop_front(), Some(1));
        assert_eq!(q.pop_front(), Some(2));
    }

    #[test]
    fn clear_empties_the_queue() {
        let q = TsDeque::new();
        q.push_back(1);
        q.push_back(2);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn wait_blocks_until_a_push_arrives() {
        let q = Arc::new(TsDeque::new());

        let producer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                q.push_back(42);
            })
        };

        // Blocks until the producer pushes; afterwards the queue must be
        // observably non-empty.
        q.wait();
        assert!(!q.is_empty());
        assert_eq!(q.pop_front(), Some(42));

        producer.join().unwrap();
    }

    #[test]
    fn wait_returns_immediately_when_non_empty() {
        let q = TsDeque::new();
        q.push_front(1);
        q.wait();
        assert_eq!(q.pop_back(), Some(1));
    }
}
