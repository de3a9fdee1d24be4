//! Shared character receive buffer.
//!
//! Allocated and zeroed by the handler at init; filled by the line-assembly
//! collaborator one byte at a time.

use crate::fault::Fault;

/// Heap-backed byte buffer with a fixed capacity.
pub struct ReceiveBuffer {
    buf: Box<[u8]>,
    len: usize,
}

impl ReceiveBuffer {
    /// Allocate a zero-filled buffer of `capacity` bytes.
    ///
    /// Allocation failure is a [`Fault::BufferAlloc`]: the handler cannot
    /// run without it.
    pub fn allocate(capacity: usize) -> Result<Self, Fault> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| Fault::BufferAlloc(capacity))?;
        storage.resize(capacity, 0u8);

        Ok(Self {
            buf: storage.into_boxed_slice(),
            len: 0,
        })
    }

    /// Push a byte. Returns `false` if the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len == self.buf.len() {
            return false;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        true
    }

    /// Remove last byte
    pub fn backspace(&mut self) {
        if self.len > 0 {
            self.len -= 1;
        }
    }

    /// Clear buffer
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}
