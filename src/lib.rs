//! # SerialLineHandler
//!
//! Single-writer, multi-reader line channel for RTOS tasks.
//!
//! ## Architecture
//!
//! All registration state lives in one [`Handler`] behind one gate:
//! - Readers register a private delivery queue, at most one per task
//! - One task at a time holds write access to the line input queue
//! - The [`Dispatcher`] copies each line into every reader's queue
//! - Tasks block on their own queue, never inside the gate
//!
//! Admission and usage errors are `false` / `None`. Resource and transport
//! failures are [`Fault`]s and halt only the task that hit them.

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod fault;
pub mod gate;
pub mod handler;
pub mod message;
pub mod platform;
pub mod registry;
pub mod session;
pub mod writer;

pub use buffer::ReceiveBuffer;
pub use config::{ReadTimeout, SessionConfig, HANDLER_BUFFER_SIZE, HANDLER_READER_MAX, LINE_MAX_LEN};
pub use dispatch::Dispatcher;
pub use fault::{Fault, FaultCode, FaultState};
pub use handler::{Handler, HandlerState};
pub use message::LineMessage;
pub use platform::{CountingPool, Kernel, MessagePool, MessageQueues, QueueId, TaskId};
pub use registry::{ReaderEntry, ReaderRegistry};
pub use session::Session;
pub use writer::WriterSlot;

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");
