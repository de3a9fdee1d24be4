//! Host platform: std threads stand in for tasks.
//!
//! - Task identity is thread-local, set with [`HostKernel::bind`] or
//!   [`HostKernel::spawn_task`]; an unbound thread is given a fresh id
//!   from [`AUTO_TASK_BASE`] upward on first use
//! - Queues are bounded `crossbeam_channel`s addressed by [`QueueId`]

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::{Kernel, MessageQueues, QueueId, TaskId};
use crate::config::{ReadTimeout, QUEUE_DEPTH};
use crate::message::LineMessage;

/// First id handed to threads that never called [`HostKernel::bind`].
pub const AUTO_TASK_BASE: u32 = 0x1000;

static NEXT_AUTO_TASK: AtomicU32 = AtomicU32::new(AUTO_TASK_BASE);

thread_local! {
    static CURRENT_TASK: Cell<u32> = const { Cell::new(0) };
}

/// Thread-backed kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostKernel;

impl HostKernel {
    pub const fn new() -> Self {
        Self
    }

    /// Make the calling thread act as `task`.
    pub fn bind(task: TaskId) {
        CURRENT_TASK.with(|current| current.set(task.raw()));
    }

    /// Spawn a thread running as `task`.
    pub fn spawn_task<F, T>(task: TaskId, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        thread::Builder::new()
            .name(task.to_string())
            .spawn(move || {
                Self::bind(task);
                f()
            })
            .unwrap_or_else(|e| panic!("failed to spawn {}: {}", task, e))
    }
}

impl Kernel for HostKernel {
    fn current_task(&self) -> TaskId {
        CURRENT_TASK.with(|current| {
            if current.get() == 0 {
                current.set(NEXT_AUTO_TASK.fetch_add(1, Ordering::Relaxed));
            }
            TaskId::new(current.get())
        })
    }

    fn halt(&self) -> ! {
        log::error!("{} halted", self.current_task());
        loop {
            thread::park();
        }
    }
}

type Channel = (Sender<LineMessage>, Receiver<LineMessage>);

/// Named bounded queues.
pub struct HostQueues {
    queues: Mutex<HashMap<QueueId, Channel>>,
    next_id: AtomicU16,
    depth: usize,
}

impl HostQueues {
    pub fn new() -> Self {
        Self::with_depth(QUEUE_DEPTH)
    }

    pub fn with_depth(depth: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            next_id: AtomicU16::new(1),
            depth,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<QueueId, Channel>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a queue and return its id.
    pub fn create(&self) -> QueueId {
        let id = QueueId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.map().insert(id, bounded(self.depth));
        id
    }

    /// Tear a queue down. Blocked receivers wake up empty-handed.
    pub fn destroy(&self, queue: QueueId) {
        self.map().remove(&queue);
    }

    /// Messages waiting in `queue`.
    pub fn pending(&self, queue: QueueId) -> usize {
        self.map().get(&queue).map_or(0, |(_, rx)| rx.len())
    }
}

impl Default for HostQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueues for HostQueues {
    fn send(&self, message: LineMessage) -> Result<(), LineMessage> {
        let tx = match self.map().get(&message.target) {
            Some((tx, _)) => tx.clone(),
            None => return Err(message),
        };
        tx.try_send(message).map_err(|e| e.into_inner())
    }

    fn receive(&self, queue: QueueId, timeout: ReadTimeout) -> Option<LineMessage> {
        // Clone out so the map lock is not held while blocked
        let rx = self.map().get(&queue).map(|(_, rx)| rx.clone())?;
        match timeout {
            ReadTimeout::Forever => rx.recv().ok(),
            ReadTimeout::Millis(ms) => rx.recv_timeout(Duration::from_millis(ms as u64)).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_sets_current_task() {
        let kernel = HostKernel::new();
        HostKernel::bind(TaskId::new(42));
        assert_eq!(kernel.current_task(), TaskId::new(42));

        let other = HostKernel::spawn_task(TaskId::new(7), move || kernel.current_task());
        assert_eq!(other.join().unwrap(), TaskId::new(7));

        // Binding on another thread does not leak here
        assert_eq!(kernel.current_task(), TaskId::new(42));
    }

    #[test]
    fn test_unbound_threads_get_distinct_ids() {
        let kernel = HostKernel::new();
        let a = thread::spawn(move || (kernel.current_task(), kernel.current_task()));
        let b = thread::spawn(move || kernel.current_task());

        let (a1, a2) = a.join().unwrap();
        let b1 = b.join().unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, b1);
        assert!(a1.raw() >= AUTO_TASK_BASE && b1.raw() >= AUTO_TASK_BASE);
    }

    #[test]
    fn test_queue_fifo() {
        let queues = HostQueues::new();
        let q = queues.create();

        for text in [&b"a\n"[..], &b"b\n"[..]] {
            let mut msg = LineMessage::EMPTY;
            msg.fill(q, text);
            queues.send(msg).unwrap();
        }
        assert_eq!(queues.pending(q), 2);

        let first = queues.receive(q, ReadTimeout::Millis(10)).unwrap();
        let second = queues.receive(q, ReadTimeout::Millis(10)).unwrap();
        assert_eq!(first.as_bytes(), b"a\n");
        assert_eq!(second.as_bytes(), b"b\n");
    }

    #[test]
    fn test_send_to_unknown_queue_fails() {
        let queues = HostQueues::new();
        let mut msg = LineMessage::EMPTY;
        msg.fill(QueueId::new(99), b"x\n");
        assert!(queues.send(msg).is_err());
    }

    #[test]
    fn test_send_to_full_queue_fails() {
        let queues = HostQueues::with_depth(1);
        let q = queues.create();
        let mut msg = LineMessage::EMPTY;
        msg.fill(q, b"x\n");

        assert!(queues.send(msg).is_ok());
        assert!(queues.send(msg).is_err());
    }

    #[test]
    fn test_receive_times_out() {
        let queues = HostQueues::new();
        let q = queues.create();
        assert!(queues.receive(q, ReadTimeout::Millis(5)).is_none());
    }

    #[test]
    fn test_destroy_wakes_blocked_receiver() {
        let queues = std::sync::Arc::new(HostQueues::new());
        let q = queues.create();

        let waiter = {
            let queues = queues.clone();
            thread::spawn(move || queues.receive(q, ReadTimeout::Forever))
        };
        thread::sleep(Duration::from_millis(20));
        queues.destroy(q);

        assert!(waiter.join().unwrap().is_none());
    }
}
