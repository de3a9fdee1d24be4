//! Line dispatcher: the broadcast half of the channel.
//!
//! Drains the handler's line input queue and copies each line into every
//! registered reader's delivery queue.
//!
//! ```text
//! writer ──▶ line_input ──▶ Dispatcher ──┬──▶ reader A queue
//!                                        ├──▶ reader B queue
//!                                        └──▶ reader C queue
//! ```
//!
//! # Contract
//!
//! - Reader queues are snapshotted under the gate; sends happen outside it
//! - A reader whose copy cannot be allocated or whose queue refuses it
//!   misses that line (counted in `dropped`); the dispatcher never stalls
//!   for one slow reader
//! - A broken line input queue is a fault

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::ReadTimeout;
use crate::fault::Fault;
use crate::handler::Handler;
use crate::message::LineMessage;
use crate::platform::{Kernel, MessagePool, MessageQueues};

/// Fan-out task state.
pub struct Dispatcher<'a, K, Q, P, const N: usize> {
    handler: &'a Handler<N>,
    kernel: &'a K,
    queues: &'a Q,
    pool: &'a P,
    dropped: AtomicU32,
}

impl<'a, K, Q, P, const N: usize> Dispatcher<'a, K, Q, P, N>
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
            dropped: AtomicU32::new(0),
        }
    }

    /// Receive one line from the line input queue and fan it out.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(n))` - line delivered to `n` readers
    /// - `Ok(None)` - bounded timeout expired, nothing received
    /// - `Err(Fault)` - line input queue broken or gate poisoned
    pub fn try_dispatch_one(&self, timeout: ReadTimeout) -> Result<Option<usize>, Fault> {
        let line_input = self.handler.line_input();

        let line = match self.queues.receive(line_input, timeout) {
            Some(line) => line,
            None if timeout.is_forever() => return Err(Fault::Receive(line_input.raw())),
            None => return Ok(None),
        };

        let result = self.fan_out(&line);
        self.pool.free(line);
        result.map(Some)
    }

    fn fan_out(&self, line: &LineMessage) -> Result<usize, Fault> {
        // Gate is held only for the copy
        let readers = self.handler.snapshot()?.readers;
        let mut delivered = 0;

        for reader in readers.iter() {
            let Some(mut copy) = self.pool.alloc() else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("{} missed a line (message pool empty)", reader.task);
                continue;
            };
            copy.fill(reader.queue, line.as_bytes());

            match self.queues.send(copy) {
                Ok(()) => delivered += 1,
                Err(copy) => {
                    self.pool.free(copy);
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{} missed a line ({} full)", reader.task, reader.queue);
                }
            }
        }

        Ok(delivered)
    }

    /// Dispatch forever. Halts the calling task on fault.
    pub fn run(&self) -> ! {
        loop {
            if let Err(fault) = self.try_dispatch_one(ReadTimeout::Forever) {
                self.handler.faults().halt(self.kernel, fault);
            }
        }
    }

    /// Lines readers missed because their queue was full or gone.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
