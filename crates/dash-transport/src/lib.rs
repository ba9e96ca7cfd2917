//! Dash Transport
//!
//! Owns one WebSocket per attach attempt. Inbound frames become typed
//! events on a shared channel, tagged with the attempt that produced them
//! so stale connections can be told apart from the current one.

mod attempt;
mod connection;
mod error;

pub use attempt::AttemptId;
pub use connection::{Connection, ConnectionEvent, ConnectionState, TransportEvent};
pub use error::TransportError;

pub type Result<T> = std::result::Result<T, TransportError>;
