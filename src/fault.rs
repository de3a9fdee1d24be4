//! Fault handling for the line handler.
//!
//! # Philosophy
//!
//! > An exhausted pool or a broken queue is a misconfigured system,
//! > not a busy one. Record it and stop the task.
//!
//! Admission failures (registry full, duplicate open, writer busy) are
//! ordinary `false` results. Everything in [`Fault`] halts the task that hit
//! it; the handler itself stays usable for every other task.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::platform::{Kernel, TaskId};

/// Unrecoverable resource or transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// Receive buffer could not be allocated at init.
    #[error("unable to allocate {0} bytes for the receive buffer")]
    BufferAlloc(usize),

    /// Gate could not be acquired (a holder died while inside it).
    #[error("gate lock failed")]
    GateLock,

    /// Message pool exhausted.
    #[error("could not allocate a message")]
    MessageAlloc,

    /// Queue refused a message.
    #[error("could not send a message to queue {0}")]
    Send(u16),

    /// Unbounded receive returned without a message.
    #[error("could not receive a message from queue {0}")]
    Receive(u16),
}

impl Fault {
    /// Stable code for the lock-free fault record.
    pub fn code(&self) -> FaultCode {
        match self {
            Fault::BufferAlloc(_) => FaultCode::BufferAlloc,
            Fault::GateLock => FaultCode::GateLock,
            Fault::MessageAlloc => FaultCode::MessageAlloc,
            Fault::Send(_) => FaultCode::Send,
            Fault::Receive(_) => FaultCode::Receive,
        }
    }

    /// Fault-specific detail (size or queue id).
    pub fn data(&self) -> u32 {
        match *self {
            Fault::BufferAlloc(size) => u32::try_from(size).unwrap_or(u32::MAX),
            Fault::Send(queue) | Fault::Receive(queue) => queue as u32,
            Fault::GateLock | Fault::MessageAlloc => 0,
        }
    }
}

/// Fault codes indicating why a task was halted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,
    BufferAlloc = 1,
    GateLock = 2,
    MessageAlloc = 3,
    Send = 4,
    Receive = 5,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::BufferAlloc,
            2 => FaultCode::GateLock,
            3 => FaultCode::MessageAlloc,
            4 => FaultCode::Send,
            5 => FaultCode::Receive,
            _ => FaultCode::None,
        }
    }
}

/// Thread-safe record of the most recent fault.
///
/// Written by the task that faults, just before it halts. Read by whoever
/// supervises the system (console, watchdog, tests).
///
/// # Usage
///
/// ```ignore
/// static FAULTS: FaultState = FaultState::new();
///
/// // In a session call:
/// if let Err(fault) = session.try_write_line(queue, line) {
///     FAULTS.record(fault, task);
///     kernel.halt();
/// }
///
/// // In a supervisor:
/// if FAULTS.is_active() {
///     report(FAULTS.snapshot());
/// }
/// ```
pub struct FaultState {
    /// True once any task has faulted.
    active: AtomicBool,

    /// Fault code of the most recent fault.
    code: AtomicU8,

    /// Detail of the most recent fault (size, queue id).
    data: AtomicU32,

    /// Task that faulted most recently.
    task: AtomicU32,

    /// Total fault count since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            task: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault raised by `task`.
    #[inline]
    pub fn record(&self, fault: Fault, task: TaskId) {
        self.code.store(fault.code() as u8, Ordering::Release);
        self.data.store(fault.data(), Ordering::Release);
        self.task.store(task.raw(), Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Record `fault` against the calling task, then halt it.
    ///
    /// Only the calling task stops; the handler stays usable.
    pub fn halt<K: Kernel + ?Sized>(&self, kernel: &K, fault: Fault) -> ! {
        let task = kernel.current_task();
        log::error!("{}: {}", task, fault);
        self.record(fault, task);
        kernel.halt()
    }

    /// Check if a fault has been recorded and not cleared.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Task halted by the most recent fault.
    #[inline]
    pub fn task(&self) -> TaskId {
        TaskId::new(self.task.load(Ordering::Acquire))
    }

    /// Get total fault count since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear the active flag. The counter is kept for diagnostics.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Get a snapshot of the current fault state.
    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            task: self.task(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub task: TaskId,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_state_basic() {
        let faults = FaultState::new();

        assert!(!faults.is_active());
        assert_eq!(faults.code(), FaultCode::None);
        assert_eq!(faults.count(), 0);

        faults.record(Fault::Receive(7), TaskId::new(3));

        assert!(faults.is_active());
        assert_eq!(faults.code(), FaultCode::Receive);
        assert_eq!(faults.data(), 7);
        assert_eq!(faults.task(), TaskId::new(3));
        assert_eq!(faults.count(), 1);

        faults.clear();

        assert!(!faults.is_active());
        assert_eq!(faults.count(), 1); // Count preserved
    }

    #[test]
    fn test_fault_count_accumulates() {
        let faults = FaultState::new();

        faults.record(Fault::MessageAlloc, TaskId::new(1));
        faults.clear();
        faults.record(Fault::GateLock, TaskId::new(2));
        faults.clear();
        faults.record(Fault::Send(4), TaskId::new(1));

        let snap = faults.snapshot();
        assert_eq!(snap.count, 3);
        assert_eq!(snap.code, FaultCode::Send);
        assert_eq!(snap.task, TaskId::new(1));
    }

    #[test]
    fn test_oversized_alloc_data_saturates() {
        assert_eq!(Fault::BufferAlloc(128).data(), 128);
        assert_eq!(Fault::BufferAlloc(usize::MAX).data(), u32::MAX);
    }

    #[test]
    fn test_fault_code_round_trip() {
        for fault in [
            Fault::BufferAlloc(128),
            Fault::GateLock,
            Fault::MessageAlloc,
            Fault::Send(1),
            Fault::Receive(2),
        ] {
            let code = fault.code();
            assert_eq!(FaultCode::from_u8(code as u8), code);
        }
        assert_eq!(FaultCode::from_u8(200), FaultCode::None);
    }

    #[test]
    fn test_fault_display() {
        let text = std::format!("{}", Fault::Send(9));
        assert!(text.contains("queue 9"));
    }
}
