//! Writer slot: who may push lines right now.
//!
//! Exclusive and non-blocking. A second writer fails immediately instead of
//! waiting; there is no queue of would-be writers.

use crate::platform::TaskId;

/// Holder of write access, `TaskId::NONE` when free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterSlot {
    holder: TaskId,
}

impl WriterSlot {
    pub const fn new() -> Self {
        Self {
            holder: TaskId::NONE,
        }
    }

    /// Grant write access to `task` if nobody holds it.
    ///
    /// `TaskId::NONE` can never hold the slot.
    pub fn acquire(&mut self, task: TaskId) -> bool {
        if task.is_none() || !self.holder.is_none() {
            return false;
        }
        self.holder = task;
        true
    }

    /// Give up write access. Only the holder can release.
    pub fn release(&mut self, task: TaskId) {
        if self.holder == task {
            self.holder = TaskId::NONE;
        }
    }

    /// Current holder, if any.
    #[inline]
    pub fn holder(&self) -> Option<TaskId> {
        (!self.holder.is_none()).then_some(self.holder)
    }
}
