//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Session response has no id")]
    MissingId,

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input queue is full ({limit} bytes)")]
    OutboxFull { limit: usize },

    #[error("Session name cannot be empty")]
    EmptyName,
}
