//! FreeRTOS platform under ESP-IDF.
//!
//! - Task identity is the FreeRTOS task handle
//! - Halting suspends the calling task (`vTaskSuspend(NULL)`)
//! - Queues are created once at start-up and never destroyed; `QueueId`
//!   is the 1-based index into that fixed set

use esp_idf_svc::hal::delay::{TickType, BLOCK};
use esp_idf_svc::hal::task::queue::Queue;
use esp_idf_svc::sys;

use super::{Kernel, MessageQueues, QueueId, TaskId};
use crate::config::ReadTimeout;
use crate::message::LineMessage;

/// FreeRTOS kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct EspKernel;

impl EspKernel {
    pub const fn new() -> Self {
        Self
    }
}

impl Kernel for EspKernel {
    fn current_task(&self) -> TaskId {
        // SAFETY: xTaskGetCurrentTaskHandle is always safe to call from a task
        let handle = unsafe { sys::xTaskGetCurrentTaskHandle() };
        // Handles are 32-bit pointers on Xtensa/RISC-V ESP32 parts
        TaskId::new(handle as usize as u32)
    }

    fn halt(&self) -> ! {
        loop {
            // SAFETY: NULL suspends the calling task
            unsafe { sys::vTaskSuspend(core::ptr::null_mut()) };
        }
    }
}

/// Fixed set of FreeRTOS queues carrying `LineMessage` by value.
pub struct EspQueues {
    queues: Vec<Queue<LineMessage>>,
}

impl EspQueues {
    /// Create `count` queues of `depth` messages each.
    ///
    /// Ids are `1..=count`.
    pub fn new(count: usize, depth: usize) -> Self {
        Self {
            queues: (0..count).map(|_| Queue::new(depth)).collect(),
        }
    }

    /// Id of the `n`th queue (0-based).
    pub fn id(&self, n: usize) -> Option<QueueId> {
        (n < self.queues.len()).then(|| QueueId::new((n + 1) as u16))
    }

    fn get(&self, queue: QueueId) -> Option<&Queue<LineMessage>> {
        (queue.raw() as usize)
            .checked_sub(1)
            .and_then(|idx| self.queues.get(idx))
    }
}

impl MessageQueues for EspQueues {
    fn send(&self, message: LineMessage) -> Result<(), LineMessage> {
        let Some(queue) = self.get(message.target) else {
            return Err(message);
        };
        // Non-blocking: a full queue is a refusal, not a wait
        match queue.send_back(message, 0) {
            Ok(_) => Ok(()),
            Err(_) => Err(message),
        }
    }

    fn receive(&self, queue: QueueId, timeout: ReadTimeout) -> Option<LineMessage> {
        let queue = self.get(queue)?;
        let ticks = match timeout {
            ReadTimeout::Forever => BLOCK,
            ReadTimeout::Millis(ms) => TickType::new_millis(ms as u64).ticks(),
        };
        queue.recv_front(ticks).map(|(message, _)| message)
    }
}
