//! JSON-RPC transport to the editor host.

pub mod framing;
mod stdio;

pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_BYTES};
pub use stdio::{InboundNotification, StdioHost};
