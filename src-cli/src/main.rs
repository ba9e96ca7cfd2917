//! Dash - remote terminal client
//!
//! Relays the local terminal to a backend that owns the shell, with
//! session and window tabs driven by Ctrl-B key bindings.

mod input;
mod surface;

use anyhow::Context;
use clap::Parser;
use futures_util::StreamExt;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedSender};

use dash_core::{Client, Command, Config, ProvisioningMode, SurfaceEvent};

use input::InputMapper;
use surface::CrosstermSurface;

/// Terminal client for containerized shells
#[derive(Parser, Debug)]
#[command(name = "dash")]
#[command(about = "Remote terminal client with session and window tabs", long_about = None)]
#[command(version)]
struct Args {
    /// Backend HTTP origin, e.g. http://127.0.0.1:8080
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// How sessions are reached: multiplexed or http-sessions
    #[arg(long, value_name = "MODE")]
    mode: Option<ProvisioningMode>,

    /// Session to create in http-sessions mode
    #[arg(long, value_name = "NAME")]
    session: Option<String>,

    /// Delay before reconnecting, in milliseconds
    #[arg(long, value_name = "MS")]
    retry_delay_ms: Option<u64>,

    /// Don't connect to the first running container automatically
    #[arg(long)]
    no_auto_select: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file (default: dash.log in the data dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(session) = &self.session {
            config.session_name = session.clone();
        }
        if let Some(delay) = self.retry_delay_ms {
            config.retry_delay_ms = delay;
        }
        if self.no_auto_select {
            config.auto_select_running = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::config_path);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    args.apply(&mut config);
    config.validate()?;

    let log_path = args.log_file.clone().unwrap_or_else(Config::log_path);
    dash_core::init_file_logging(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let surface = CrosstermSurface::new().context("Failed to enter raw mode")?;
    let client = Client::new(config, surface)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let (cols, rows) = crossterm::terminal::size()?;
    tx.send(SurfaceEvent::Resize { cols, rows })?;
    let reader = tokio::spawn(forward_events(tx));

    let result = client.run(rx).await;
    reader.abort();

    // Dropping the surface restores the terminal
    drop(result?);
    Ok(())
}

async fn forward_events(tx: UnboundedSender<SurfaceEvent>) {
    let mut events = crossterm::event::EventStream::new();
    let mut mapper = InputMapper::new();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read terminal event");
                let _ = tx.send(SurfaceEvent::Command(Command::Quit));
                break;
            }
        };

        let Some(event) = mapper.map(event) else {
            continue;
        };
        let quit = event == SurfaceEvent::Command(Command::Quit);
        if tx.send(event).is_err() || quit {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "dash",
            "--server",
            "https://example.com",
            "--mode",
            "http-sessions",
            "--session",
            "work",
            "--no-auto-select",
        ]);

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.server_url, "https://example.com");
        assert_eq!(config.mode, ProvisioningMode::HttpSessions);
        assert_eq!(config.session_name, "work");
        assert!(!config.auto_select_running);
        assert_eq!(config.retry_delay_ms, 3000);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["dash"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
