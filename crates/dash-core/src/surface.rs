//! Terminal surface contract
//!
//! The surface shows remote output and produces the user's keystrokes and
//! viewport changes. It never feeds its own writes back as input.

use dash_session::StatusIndicator;

/// What the user did at the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Encoded keystrokes for the remote terminal
    Input(Vec<u8>),
    Resize { cols: u16, rows: u16 },
    Command(Command),
}

/// Local commands bound to keys rather than sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NewSession,
    NextSession,
    PreviousSession,
    NewWindow,
    NextWindow,
    PreviousWindow,
    /// Ask the backend about the active container
    ContainerInfo,
    ListContainers,
    ListSessions,
    Reconnect,
    Quit,
}

/// Snapshot of both tab sets for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabStrip {
    pub sessions: Vec<String>,
    pub active_session: Option<String>,
    pub windows: Vec<String>,
    pub active_window: Option<String>,
}

pub trait TerminalSurface: Send {
    /// Append bytes to the visible buffer.
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    fn set_status(&mut self, indicator: StatusIndicator, message: &str) -> std::io::Result<()>;

    fn show_tabs(&mut self, _tabs: &TabStrip) -> std::io::Result<()> {
        Ok(())
    }
}
