//! Mutual-exclusion gate.
//!
//! One lock around the reader registry and the writer slot. Held only for
//! the bookkeeping itself, never across a blocking receive or a send.
//!
//! On ESP-IDF `std::sync::Mutex` is a pthread mutex over a FreeRTOS mutex,
//! so contention blocks with priority inheritance rather than spinning.

use std::sync::{Mutex, MutexGuard};

use crate::fault::Fault;

/// Lock that reports acquisition failure as a [`Fault`].
#[derive(Debug, Default)]
pub struct Gate<T> {
    inner: Mutex<T>,
}

impl<T> Gate<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Enter the gate.
    ///
    /// Fails with [`Fault::GateLock`] if a previous holder panicked inside;
    /// the guarded state may be half-updated and must not be trusted.
    pub fn lock(&self) -> Result<MutexGuard<'_, T>, Fault> {
        self.inner.lock().map_err(|_| {
            log::error!("Mutex lock failed.");
            Fault::GateLock
        })
    }

    /// Run `f` inside the gate.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, Fault> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_with_mutates() {
        let gate = Gate::new(0u32);
        gate.with(|n| *n += 5).unwrap();
        assert_eq!(gate.with(|n| *n).unwrap(), 5);
    }

    #[test]
    fn test_poisoned_gate_faults() {
        let gate = Arc::new(Gate::new(0u32));

        let g = Arc::clone(&gate);
        let result = thread::spawn(move || {
            let _guard = g.lock().unwrap();
            panic!("holder dies inside the gate");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(gate.lock().err(), Some(Fault::GateLock));
    }

    #[test]
    fn test_serializes_updates() {
        let gate = Arc::new(Gate::new(0u32));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        gate.with(|n| *n += 1).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.with(|n| *n).unwrap(), 8000);
    }
}
