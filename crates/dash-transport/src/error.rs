//! Transport error types

use thiserror::Error;

use crate::connection::ConnectionState;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection is not open (state: {0})")]
    NotOpen(ConnectionState),

    #[error("Connection task has stopped")]
    Closed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] dash_protocol::ProtocolError),
}
