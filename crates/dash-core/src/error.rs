//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] dash_protocol::ProtocolError),

    #[error("Tab error: {0}")]
    Tab(#[from] dash_tabs::TabError),

    #[error("Transport error: {0}")]
    Transport(#[from] dash_transport::TransportError),

    #[error("Session error: {0}")]
    Session(#[from] dash_session::SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}
