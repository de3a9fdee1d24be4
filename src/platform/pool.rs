//! Counting message pool.
//!
//! Messages are plain `Copy` values copied into the kernel queues, so the
//! pool only has to bound how many are in flight. Exhaustion behaves like
//! a drained RTOS message pool: `alloc` returns `None`.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::MessagePool;
use crate::config::MESSAGE_POOL_SIZE;
use crate::message::LineMessage;

#[derive(Debug)]
pub struct CountingPool {
    capacity: usize,
    in_use: AtomicUsize,
}

impl CountingPool {
    pub const fn new() -> Self {
        Self::with_capacity(MESSAGE_POOL_SIZE)
    }

    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            in_use: AtomicUsize::new(0),
        }
    }

    /// Messages allocated and not yet freed.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CountingPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagePool for CountingPool {
    fn alloc(&self) -> Option<LineMessage> {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .ok()
            .map(|_| LineMessage::EMPTY)
    }

    fn free(&self, _message: LineMessage) {
        // Saturate: a stray double free must not wrap the counter
        let _ = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}
