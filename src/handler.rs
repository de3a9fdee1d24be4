//! Handler state: the context every session operates on.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────── Gate ────────────────┐
//! open_read ──▶│ ReaderRegistry<N>  [(task, queue)…]  │
//! open_write ─▶│ WriterSlot         task | none       │
//! close ──────▶│                                      │
//!              └──────────────────────────────────────┘
//!              ReceiveBuffer (own lock, filled by line assembly)
//!              char_input / line_input queue handles
//! ```
//!
//! Every method takes the calling task explicitly. [`Session`](crate::Session)
//! supplies it from the kernel; tests pass it directly.

use std::sync::{Mutex, MutexGuard};

use crate::buffer::ReceiveBuffer;
use crate::config::{HANDLER_BUFFER_SIZE, HANDLER_READER_MAX};
use crate::fault::{Fault, FaultState};
use crate::gate::Gate;
use crate::platform::{QueueId, TaskId};
use crate::registry::ReaderRegistry;
use crate::writer::WriterSlot;

/// State guarded by the gate.
#[derive(Clone, Debug)]
pub struct HandlerState<const N: usize> {
    pub readers: ReaderRegistry<N>,
    pub writer: WriterSlot,
}

impl<const N: usize> HandlerState<N> {
    pub const fn new() -> Self {
        Self {
            readers: ReaderRegistry::new(),
            writer: WriterSlot::new(),
        }
    }
}

impl<const N: usize> Default for HandlerState<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Line handler with room for `N` readers.
pub struct Handler<const N: usize = HANDLER_READER_MAX> {
    gate: Gate<HandlerState<N>>,
    buffer: Mutex<ReceiveBuffer>,
    faults: FaultState,
    char_input: QueueId,
    line_input: QueueId,
}

impl<const N: usize> Handler<N> {
    /// Create the handler with the configured receive buffer size.
    pub fn new(char_input: QueueId, line_input: QueueId) -> Result<Self, Fault> {
        Self::with_buffer_size(HANDLER_BUFFER_SIZE, char_input, line_input)
    }

    /// Create the handler with an explicit receive buffer size.
    pub fn with_buffer_size(
        buffer_size: usize,
        char_input: QueueId,
        line_input: QueueId,
    ) -> Result<Self, Fault> {
        let buffer = ReceiveBuffer::allocate(buffer_size).inspect_err(|_| {
            log::error!("Unable to allocate memory for character buffer.");
        })?;

        log::debug!(
            "handler up: {} readers, {} byte buffer, char_input={}, line_input={}",
            N,
            buffer_size,
            char_input,
            line_input
        );

        Ok(Self {
            gate: Gate::new(HandlerState::new()),
            buffer: Mutex::new(buffer),
            faults: FaultState::new(),
            char_input,
            line_input,
        })
    }

    /// Queue the serial transport feeds raw characters into.
    #[inline]
    pub fn char_input(&self) -> QueueId {
        self.char_input
    }

    /// Queue assembled lines go to; handed to the writer by `open_write`.
    #[inline]
    pub fn line_input(&self) -> QueueId {
        self.line_input
    }

    /// Record of faults raised by tasks using this handler.
    #[inline]
    pub fn faults(&self) -> &FaultState {
        &self.faults
    }

    /// Register `task` to read from `queue`.
    ///
    /// `false` if the task already reads, the registry is full, or the
    /// caller has no identity / passed the null queue.
    pub fn open_read(&self, task: TaskId, queue: QueueId) -> Result<bool, Fault> {
        if task.is_none() || queue.is_null() {
            return Ok(false);
        }

        let mut state = self.gate.lock()?;

        if state.readers.contains(task) {
            log::debug!("{} already has read privileges", task);
            return Ok(false);
        }

        let added = state.readers.add(task, queue);
        if !added {
            log::debug!("{} rejected: reader registry full ({})", task, N);
        }
        Ok(added)
    }

    /// Delivery queue registered for `task`.
    pub fn reader_queue(&self, task: TaskId) -> Result<Option<QueueId>, Fault> {
        self.gate.with(|state| state.readers.lookup(task))
    }

    /// Grant write access to `task`.
    ///
    /// Returns the line input queue on success, `None` if another task
    /// already writes.
    pub fn open_write(&self, task: TaskId) -> Result<Option<QueueId>, Fault> {
        let mut state = self.gate.lock()?;

        if !state.writer.acquire(task) {
            log::debug!("{} rejected: writer held by {:?}", task, state.writer.holder());
            return Ok(None);
        }
        Ok(Some(self.line_input))
    }

    /// Drop every registration `task` holds. Always succeeds.
    pub fn close(&self, task: TaskId) -> Result<bool, Fault> {
        let mut state = self.gate.lock()?;
        state.readers.remove(task);
        state.writer.release(task);
        Ok(true)
    }

    /// Copy of the gated state, taken under the gate.
    pub fn snapshot(&self) -> Result<HandlerState<N>, Fault> {
        self.gate.with(|state| state.clone())
    }

    /// Number of registered readers.
    pub fn reader_count(&self) -> Result<usize, Fault> {
        self.gate.with(|state| state.readers.len())
    }

    /// Task currently holding write access.
    pub fn writer(&self) -> Result<Option<TaskId>, Fault> {
        self.gate.with(|state| state.writer.holder())
    }

    /// Receive buffer, for the line-assembly collaborator.
    pub fn buffer(&self) -> Result<MutexGuard<'_, ReceiveBuffer>, Fault> {
        self.buffer.lock().map_err(|_| {
            log::error!("Buffer lock failed.");
            Fault::GateLock
        })
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler<const N: usize>() -> Handler<N> {
        Handler::new(QueueId::new(1), QueueId::new(2)).unwrap()
    }

    fn task(n: u32) -> TaskId {
        TaskId::new(n)
    }

    #[test]
    fn test_init_state() {
        let h = handler::<4>();
        assert_eq!(h.char_input(), QueueId::new(1));
        assert_eq!(h.line_input(), QueueId::new(2));
        assert_eq!(h.reader_count().unwrap(), 0);
        assert_eq!(h.writer().unwrap(), None);
        assert_eq!(h.capacity(), 4);

        let buffer = h.buffer().unwrap();
        assert_eq!(buffer.capacity(), HANDLER_BUFFER_SIZE);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_alloc_failure_faults() {
        let result = Handler::<2>::with_buffer_size(usize::MAX, QueueId::new(1), QueueId::new(2));
        assert_eq!(result.err(), Some(Fault::BufferAlloc(usize::MAX)));
    }

    #[test]
    fn test_duplicate_open_read_rejected_without_change() {
        let h = handler::<4>();
        assert!(h.open_read(task(1), QueueId::new(10)).unwrap());

        let before = h.snapshot().unwrap();
        assert!(!h.open_read(task(1), QueueId::new(11)).unwrap());
        let after = h.snapshot().unwrap();

        assert_eq!(before.readers.entries(), after.readers.entries());
        assert_eq!(h.reader_queue(task(1)).unwrap(), Some(QueueId::new(10)));
    }

    #[test]
    fn test_open_read_rejects_null_inputs() {
        let h = handler::<4>();
        assert!(!h.open_read(TaskId::NONE, QueueId::new(10)).unwrap());
        assert!(!h.open_read(task(1), QueueId::NULL).unwrap());
        assert_eq!(h.reader_count().unwrap(), 0);
    }

    #[test]
    fn test_reader_and_writer_independent() {
        let h = handler::<4>();
        assert!(h.open_read(task(1), QueueId::new(10)).unwrap());
        assert_eq!(h.open_write(task(1)).unwrap(), Some(QueueId::new(2)));

        assert!(h.close(task(1)).unwrap());
        assert_eq!(h.reader_queue(task(1)).unwrap(), None);
        assert_eq!(h.writer().unwrap(), None);
    }

    #[test]
    fn test_close_only_touches_caller() {
        let h = handler::<4>();
        h.open_read(task(1), QueueId::new(10)).unwrap();
        h.open_read(task(2), QueueId::new(20)).unwrap();
        h.open_write(task(2)).unwrap();

        h.close(task(1)).unwrap();

        assert_eq!(h.reader_queue(task(2)).unwrap(), Some(QueueId::new(20)));
        assert_eq!(h.writer().unwrap(), Some(task(2)));
    }

    #[test]
    fn test_buffer_shared_with_assembler() {
        let h = handler::<1>();
        {
            let mut buffer = h.buffer().unwrap();
            for &b in b"ok" {
                buffer.push(b);
            }
        }
        assert_eq!(h.buffer().unwrap().as_bytes(), b"ok");
    }

    #[test]
    fn test_poisoned_buffer_reports_lock_fault() {
        let h = handler::<1>();

        std::thread::scope(|s| {
            let assembler = s.spawn(|| {
                let _buffer = h.buffer().unwrap();
                panic!("assembler died holding the buffer");
            });
            assert!(assembler.join().is_err());
        });

        assert_eq!(h.buffer().err(), Some(Fault::GateLock));
        // Gate is separate and still usable
        assert!(h.open_read(task(1), QueueId::new(10)).unwrap());
    }
}
