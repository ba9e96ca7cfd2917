//! Crossterm terminal surface
//!
//! Remote output goes straight to stdout. The status indicator and the
//! tab strip are shown in the window title so they never interleave with
//! the remote screen.

use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, SetTitle};
use std::io::{self, Stdout, Write};

use dash_core::{StatusIndicator, TabStrip, TerminalSurface};

pub struct CrosstermSurface {
    stdout: Stdout,
    status: String,
    tabs: String,
}

impl CrosstermSurface {
    /// Put the terminal into raw mode. Restored on drop.
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self {
            stdout: io::stdout(),
            status: StatusIndicator::Connecting.as_str().to_string(),
            tabs: String::new(),
        })
    }

    fn refresh_title(&mut self) -> io::Result<()> {
        let title = if self.tabs.is_empty() {
            format!("dash [{}]", self.status)
        } else {
            format!("dash [{}] {}", self.status, self.tabs)
        };
        execute!(self.stdout, SetTitle(title))
    }
}

impl TerminalSurface for CrosstermSurface {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stdout.write_all(bytes)?;
        self.stdout.flush()
    }

    fn set_status(&mut self, indicator: StatusIndicator, message: &str) -> io::Result<()> {
        let marker = match indicator {
            StatusIndicator::Connecting => "◌",
            StatusIndicator::Connected => "●",
            StatusIndicator::Disconnected => "○",
        };
        self.status = format!("{marker} {message}");
        self.refresh_title()
    }

    fn show_tabs(&mut self, tabs: &TabStrip) -> io::Result<()> {
        self.tabs = render_tabs(tabs);
        self.refresh_title()
    }
}

impl Drop for CrosstermSurface {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.stdout.write_all(b"\r\n");
        let _ = self.stdout.flush();
    }
}

/// `web-1 *db-1* | *bash* htop`, active tabs starred.
fn render_tabs(tabs: &TabStrip) -> String {
    let group = |names: &[String], active: Option<&str>| {
        names
            .iter()
            .map(|name| {
                if Some(name.as_str()) == active {
                    format!("*{name}*")
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    let sessions = group(&tabs.sessions, tabs.active_session.as_deref());
    let windows = group(&tabs.windows, tabs.active_window.as_deref());
    match (sessions.is_empty(), windows.is_empty()) {
        (true, true) => String::new(),
        (false, true) => sessions,
        (true, false) => format!("| {windows}"),
        (false, false) => format!("{sessions} | {windows}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tabs() {
        let tabs = TabStrip {
            sessions: vec!["web-1".to_string(), "db-1".to_string()],
            active_session: Some("db-1".to_string()),
            windows: vec!["bash".to_string(), "htop".to_string()],
            active_window: Some("bash".to_string()),
        };
        assert_eq!(render_tabs(&tabs), "web-1 *db-1* | *bash* htop");
    }

    #[test]
    fn test_render_empty_tabs() {
        assert_eq!(render_tabs(&TabStrip::default()), "");

        let tabs = TabStrip {
            windows: vec!["bash".to_string()],
            ..TabStrip::default()
        };
        assert_eq!(render_tabs(&tabs), "| bash");
    }
}
