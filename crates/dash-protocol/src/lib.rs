//! Dash Wire Protocol
//!
//! Messages exchanged with the terminal backend over a WebSocket.
//! Structured messages travel in a `{type, payload}` envelope; the raw variant
//! sends keystrokes as unframed bytes and keeps JSON for control only.

mod error;
mod frame;
mod message;

pub use error::ProtocolError;
pub use frame::{classify_frame, Frame, Inbound};
pub use message::{
    ClientMessage, ContainerInfo, ErrorPayload, InputDecoder, RawControl, ServerMessage,
    SessionSummary, StatusPayload, TerminalOutput,
};

pub type Result<T> = std::result::Result<T, ProtocolError>;
