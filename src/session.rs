//! Session API: what a client task calls.
//!
//! # Per-task state machines
//!
//! ```text
//! Idle ──open_read──▶ ReaderOpen ──close──▶ Idle
//! Idle ──open_write─▶ WriterOpen ──close──▶ Idle
//! ```
//!
//! Read and write registrations are independent; a task may hold both.
//!
//! # Failure policy
//!
//! - Admission and usage errors return `false` / `None`, no state change
//! - [`Fault`]s halt the calling task after recording it in
//!   [`Handler::faults`]
//!
//! Each operation has a `try_*` form that returns the fault instead of
//! halting.

use crate::config::{SessionConfig, LINE_MAX_LEN};
use crate::fault::Fault;
use crate::handler::Handler;
use crate::platform::{Kernel, MessagePool, MessageQueues, QueueId, TaskId};

/// A task's view of a [`Handler`].
///
/// Cheap to create; holds only references. The calling task is resolved
/// through the kernel on every call, so one `Session` may be shared by
/// several tasks.
pub struct Session<'a, K, Q, P, const N: usize> {
    handler: &'a Handler<N>,
    kernel: &'a K,
    queues: &'a Q,
    pool: &'a P,
    config: SessionConfig,
}

impl<'a, K, Q, P, const N: usize> Session<'a, K, Q, P, N>
where
    K: Kernel,
    Q: MessageQueues,
    P: MessagePool,
{
    pub fn new(handler: &'a Handler<N>, kernel: &'a K, queues: &'a Q, pool: &'a P) -> Self {
        Self {
            handler,
            kernel,
            queues,
            pool,
            config: SessionConfig::default(),
        }
    }

    /// Replace the session settings (read timeout).
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    fn task(&self) -> TaskId {
        self.kernel.current_task()
    }

    fn or_halt<T>(&self, result: Result<T, Fault>) -> T {
        match result {
            Ok(value) => value,
            Err(fault) => self.handler.faults().halt(self.kernel, fault),
        }
    }

    // --- Open for read ---

    pub fn try_open_read(&self, queue: QueueId) -> Result<bool, Fault> {
        self.handler.open_read(self.task(), queue)
    }

    /// Register the calling task to receive lines on `queue`.
    ///
    /// `false` if the task is already registered or the registry is full.
    pub fn open_read(&self, queue: QueueId) -> bool {
        self.or_halt(self.try_open_read(queue))
    }

    // --- Read line ---

    /// Blocking read of the next line delivered to the calling task.
    ///
    /// - `Ok(None)`: `out` is empty, the task is not registered, or a bounded
    ///   timeout expired
    /// - `Ok(Some(n))`: `n` bytes copied, capped at `out.len()`
    /// - `Err(Fault::Receive)`: an unbounded wait returned nothing
    ///
    /// The gate is released before blocking.
    pub fn try_read_line(&self, out: &mut [u8]) -> Result<Option<usize>, Fault> {
        if out.is_empty() {
            return Ok(None);
        }

        let queue = match self.handler.reader_queue(self.task())? {
            Some(queue) => queue,
            None => return Ok(None),
        };

        let timeout = self.config.read_timeout;
        let message = match self.queues.receive(queue, timeout) {
            Some(message) => message,
            None if timeout.is_forever() => {
                log::error!("Could not receive a message");
                return Err(Fault::Receive(queue.raw()));
            }
            None => return Ok(None),
        };

        let copied = message.copy_to(out);
        self.pool.free(message);
        Ok(Some(copied))
    }

    /// Read the next line, reporting how many bytes were copied.
    pub fn read_line_len(&self, out: &mut [u8]) -> Option<usize> {
        self.or_halt(self.try_read_line(out))
    }

    /// Read the next line into `out`.
    pub fn read_line(&self, out: &mut [u8]) -> bool {
        self.read_line_len(out).is_some()
    }

    // --- Open for write ---

    pub fn try_open_write(&self) -> Result<Option<QueueId>, Fault> {
        self.handler.open_write(self.task())
    }

    /// Take write access. Returns the line input queue, or `None` when
    /// another task already writes.
    pub fn open_write(&self) -> Option<QueueId> {
        self.or_halt(self.try_open_write())
    }

    // --- Write line ---

    /// Send one complete line to `queue`.
    ///
    /// `Ok(false)` without side effects unless `text` ends in `\n` and fits
    /// in a message.
    pub fn try_write_line(&self, queue: QueueId, text: &[u8]) -> Result<bool, Fault> {
        if text.last() != Some(&b'\n') || text.len() > LINE_MAX_LEN {
            return Ok(false);
        }

        let mut message = self.pool.alloc().ok_or_else(|| {
            log::error!("Could not allocate a message.");
            Fault::MessageAlloc
        })?;
        message.fill(queue, text);

        if let Err(message) = self.queues.send(message) {
            self.pool.free(message);
            log::error!("Could not send a message.");
            return Err(Fault::Send(queue.raw()));
        }
        Ok(true)
    }

    pub fn write_line(&self, queue: QueueId, text: &[u8]) -> bool {
        self.or_halt(self.try_write_line(queue, text))
    }

    // --- Close ---

    pub fn try_close(&self) -> Result<bool, Fault> {
        self.handler.close(self.task())
    }

    /// Drop the calling task's read registration and write access.
    ///
    /// Always `true`, from any state.
    pub fn close(&self) -> bool {
        self.or_halt(self.try_close())
    }
}
