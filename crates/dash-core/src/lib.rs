//! Dash Core
//!
//! Application context for the terminal client: configuration, logging,
//! the terminal surface contract and the driver that connects the tab
//! registry, the session lifecycle and the transport.

mod client;
mod config;
mod error;
mod surface;

pub use client::Client;
pub use config::Config;
pub use error::CoreError;
pub use surface::{Command, SurfaceEvent, TabStrip, TerminalSurface};

// Re-export the building blocks
pub use dash_protocol::{ClientMessage, ContainerInfo, Inbound, ServerMessage};
pub use dash_session::{
    LifecycleState, ProvisioningMode, Session, SessionApi, SessionError, SessionLifecycle,
    StatusIndicator,
};
pub use dash_tabs::{Tab, TabError, TabEvent, TabKind, TabOrigin, TabRegistry, TabSet};
pub use dash_transport::{AttemptId, ConnectionState, TransportError};

pub type Result<T> = std::result::Result<T, CoreError>;

fn env_filter() -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    EnvFilter::try_from_env("DASH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging to a file. Used while the terminal is in raw mode,
/// where stderr would corrupt the screen.
pub fn init_file_logging(path: &std::path::Path) -> Result<()> {
    use tracing_subscriber::fmt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))
}
