//! Pooled line message.
//!
//! The unit carried by the kernel queues: a small header (target queue,
//! length) followed by fixed-capacity content. Layout mirrors a FreeRTOS
//! queue item, so it is `Copy` and copied by value into the queue.

use crate::config::LINE_MAX_LEN;
use crate::platform::QueueId;

/// One line in flight between a writer and a reader.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LineMessage {
    /// Queue this message is addressed to.
    pub target: QueueId,
    /// Content length in bytes.
    pub len: u16,
    /// Content bytes (not null-terminated).
    pub content: [u8; LINE_MAX_LEN],
}

impl LineMessage {
    /// Empty message, as handed out by a pool.
    pub const EMPTY: Self = Self {
        target: QueueId::NULL,
        len: 0,
        content: [0; LINE_MAX_LEN],
    };

    /// Fill header and content.
    ///
    /// Content beyond `LINE_MAX_LEN` is dropped; callers validate length
    /// before getting here.
    #[inline]
    pub fn fill(&mut self, target: QueueId, text: &[u8]) {
        let len = text.len().min(LINE_MAX_LEN);
        self.target = target;
        self.len = len as u16;
        self.content[..len].copy_from_slice(&text[..len]);
    }

    /// Copy the content into `out`, capped at `out.len()`.
    ///
    /// Returns the number of bytes copied.
    #[inline]
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        let len = self.as_bytes().len().min(out.len());
        out[..len].copy_from_slice(&self.content[..len]);
        len
    }

    /// Content as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.content[..(self.len as usize).min(LINE_MAX_LEN)]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for LineMessage {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl core::fmt::Debug for LineMessage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LineMessage")
            .field("target", &self.target)
            .field("len", &self.len)
            .field("content", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}
