//! Module: config
//!
//! Purpose: Build-time configuration for the line handler.
//!
//! Architecture:
//! - Capacities are `const` (no dynamic growth on target)
//! - Reader capacity is also a const generic on `Handler`, defaulting here
//! - The only runtime knob is the read timeout (`SessionConfig`)

/// Capacity of the shared character receive buffer (bytes).
pub const HANDLER_BUFFER_SIZE: usize = 128;

/// Maximum number of concurrently registered readers.
pub const HANDLER_READER_MAX: usize = 8;

/// Maximum length of one line carried by a pooled message, newline included.
pub const LINE_MAX_LEN: usize = HANDLER_BUFFER_SIZE;

/// Depth of each queue created by the platform layer.
pub const QUEUE_DEPTH: usize = 16;

/// Number of messages the pool hands out before `alloc` fails.
///
/// Every reader queue plus the line input queue can be full at once.
pub const MESSAGE_POOL_SIZE: usize = QUEUE_DEPTH * (HANDLER_READER_MAX + 1);

const _: () = assert!(MESSAGE_POOL_SIZE >= QUEUE_DEPTH * (HANDLER_READER_MAX + 1));

/// How long a blocking receive may wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReadTimeout {
    /// Wait until a line arrives. A receive that returns nothing is fatal.
    #[default]
    Forever,
    /// Wait at most this many milliseconds. Expiry is reported, not fatal.
    Millis(u32),
}

impl ReadTimeout {
    /// True for the unbounded wait.
    #[inline]
    pub fn is_forever(self) -> bool {
        matches!(self, ReadTimeout::Forever)
    }
}

/// Per-session runtime settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub read_timeout: ReadTimeout,
}

impl SessionConfig {
    /// Settings with a bounded read timeout.
    pub const fn with_timeout_ms(ms: u32) -> Self {
        Self {
            read_timeout: ReadTimeout::Millis(ms),
        }
    }
}
