//! Kernel collaborators.
//!
//! The handler never talks to the RTOS directly. Task identity, task
//! suspension, queues and the message pool come in through these traits:
//!
//! - `esp`: FreeRTOS under ESP-IDF (target only)
//! - `host`: std threads + channels (tests, host demo)
//! - [`pool`]: message pool shared by both

#[cfg(not(target_os = "espidf"))]
pub mod host;
pub mod pool;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use pool::CountingPool;

use crate::config::ReadTimeout;
use crate::message::LineMessage;

/// Kernel task identifier. `0` is reserved for "no task".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TaskId(u32);

impl TaskId {
    pub const NONE: TaskId = TaskId(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Kernel queue identifier. `0` is the null queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QueueId(u16);

impl QueueId {
    /// "No channel" sentinel.
    pub const NULL: QueueId = QueueId(0);

    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for QueueId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

/// Task identity and task control.
pub trait Kernel: Sync {
    /// Identifier of the calling task.
    fn current_task(&self) -> TaskId;

    /// Suspend the calling task for good.
    fn halt(&self) -> !;
}

/// Opaque FIFO message transport.
pub trait MessageQueues: Sync {
    /// Non-blocking send to `message.target`.
    ///
    /// On failure the message is handed back so it can be returned to its
    /// pool.
    fn send(&self, message: LineMessage) -> Result<(), LineMessage>;

    /// Blocking receive. `None` on timeout or when the queue is gone.
    fn receive(&self, queue: QueueId, timeout: ReadTimeout) -> Option<LineMessage>;
}

/// Fixed-size message allocator.
pub trait MessagePool: Sync {
    /// Take a message from the pool, `None` when exhausted.
    fn alloc(&self) -> Option<LineMessage>;

    /// Return a message to the pool.
    fn free(&self, message: LineMessage);
}
