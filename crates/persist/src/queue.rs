//! Bounded blocking FIFO backed by a fixed ring of slots.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Fixed-capacity circular buffer. Not synchronized on its own.
#[derive(Debug)]
struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
    /// Total items ever pushed. The n-th push receives ticket n.
    pushed: u64,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            tail: 0,
            len: 0,
            pushed: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    fn push(&mut self, item: T) -> u64 {
        debug_assert!(!self.is_full());
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;
        self.pushed += 1;
        self.pushed
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }
}

/// Thread-safe bounded FIFO.
///
/// `push` blocks while full and `pop` blocks while empty; nothing is ever
/// dropped or reordered. The lock is held only for the ring update itself.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create a queue with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(Ring::with_capacity(capacity.max(1))),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `item` at the tail, waiting for a free slot if necessary.
    ///
    /// Returns the item's ticket: its 1-based position in the overall push
    /// order. Tickets are strictly increasing and contiguous.
    pub fn push(&self, item: T) -> u64 {
        let mut ring = self.lock();
        while ring.is_full() {
            ring = self
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let ticket = ring.push(item);
        drop(ring);
        self.not_empty.notify_one();
        ticket
    }

    /// Remove the head item, waiting until one is available.
    pub fn pop(&self) -> T {
        let mut ring = self.lock();
        loop {
            if let Some(item) = ring.pop() {
                drop(ring);
                self.not_full.notify_one();
                return item;
            }
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove the head item if there is one, without waiting.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.lock().pop();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    // Ring updates cannot panic midway, so a poisoned lock still guards a
    // consistent ring.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order_with_wraparound() {
        let queue = BoundedQueue::new(3);
        for round in 0..4 {
            queue.push(round * 10);
            queue.push(round * 10 + 1);
            assert_eq!(queue.pop(), round * 10);
            assert_eq!(queue.pop(), round * 10 + 1);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn tickets_are_contiguous() {
        let queue = BoundedQueue::new(4);
        assert_eq!(queue.push('a'), 1);
        assert_eq!(queue.push('b'), 2);
        queue.pop();
        assert_eq!(queue.push('c'), 3);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let queue = BoundedQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push(1);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn push_blocks_while_full() {
        let queue = Arc::new(BoundedQueue::new(2));
        queue.push(1);
        queue.push(2);

        let done = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = queue.clone();
            let done = done.clone();
            thread::spawn(move || {
                queue.push(3);
                done.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst), "push returned on a full queue");

        assert_eq!(queue.pop(), 1);
        producer.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(queue.pop(), 2);
        assert_eq!(queue.pop(), 3);
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(BoundedQueue::new(1));
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push("wake");
        assert_eq!(consumer.join().unwrap(), "wake");
    }

    #[test]
    fn many_producers_lose_nothing() {
        let queue = Arc::new(BoundedQueue::new(8));
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(p * 1000 + i);
                    }
                })
            })
            .collect();

        let mut seen = Vec::with_capacity(1000);
        for _ in 0..1000 {
            seen.push(queue.pop());
        }
        for producer in producers {
            producer.join().unwrap();
        }

        // Per-producer order is preserved.
        for p in 0..4 {
            let mine: Vec<_> = seen.iter().filter(|v| **v / 1000 == p).collect();
            assert_eq!(mine.len(), 250);
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
