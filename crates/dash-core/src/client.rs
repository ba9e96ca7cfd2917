//! Client context and connection driver
//!
//! `Client` owns the tab registry, the session lifecycle and the live
//! connection. `run` is the single loop that feeds surface, tab, transport
//! and timer events into the lifecycle and performs the actions it returns.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use dash_session::{
    Action, Outgoing, ProvisioningMode, Session, SessionApi, SessionError, SessionLifecycle,
};
use dash_tabs::{TabEvent, TabKind, TabOrigin, TabRegistry};
use dash_transport::{AttemptId, Connection, ConnectionEvent, TransportError};

use crate::config::Config;
use crate::surface::{Command, SurfaceEvent, TabStrip, TerminalSurface};
use crate::Result;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Results of work spawned by the driver.
#[derive(Debug)]
enum Completion {
    SessionCreated {
        attempt: AttemptId,
        result: std::result::Result<Session, String>,
    },
    SessionsListed(std::result::Result<Vec<Session>, String>),
    Retry(AttemptId),
}

pub struct Client<S: TerminalSurface> {
    config: Config,
    surface: S,
    registry: TabRegistry,
    lifecycle: SessionLifecycle,
    api: SessionApi,
    connection: Option<Connection>,
    tab_rx: UnboundedReceiver<TabEvent>,
    transport_tx: UnboundedSender<ConnectionEvent>,
    transport_rx: UnboundedReceiver<ConnectionEvent>,
    completion_tx: UnboundedSender<Completion>,
    completion_rx: UnboundedReceiver<Completion>,
}

impl<S: TerminalSurface> Client<S> {
    pub fn new(config: Config, surface: S) -> Result<Self> {
        config.validate()?;

        let (tab_tx, tab_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let registry = TabRegistry::new(tab_tx);
        let lifecycle = SessionLifecycle::new(config.lifecycle_options());
        let api = SessionApi::new(&config.base_url()?)?;

        if config.mode == ProvisioningMode::HttpSessions {
            registry
                .sessions
                .sync([config.session_name.as_str()], TabOrigin::Backend);
            registry.sessions.mark_active(&config.session_name);
            registry.follow_session(config.session_name.trim());
            tracing::debug!(endpoint = %api.endpoint(), "Provisioning sessions over HTTP");
        }

        Ok(Self {
            config,
            surface,
            registry,
            lifecycle,
            api,
            connection: None,
            tab_rx,
            transport_tx,
            transport_rx,
            completion_tx,
            completion_rx,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the tab sets
    pub fn registry(&self) -> TabRegistry {
        self.registry.clone()
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Run until the surface closes its event stream or asks to quit.
    pub async fn run(mut self, mut events: UnboundedReceiver<SurfaceEvent>) -> Result<S> {
        tracing::info!(
            server = %self.config.server_url,
            mode = %self.config.mode,
            "Client started"
        );

        self.refresh_tabs()?;
        let actions = self.lifecycle.start();
        self.execute(actions)?;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if !self.on_surface_event(event)? {
                        break;
                    }
                }
                Some(event) = self.tab_rx.recv() => self.on_tab_event(event)?,
                Some(event) = self.transport_rx.recv() => {
                    let actions = self.lifecycle.on_transport(event);
                    self.execute(actions)?;
                }
                Some(completion) = self.completion_rx.recv() => self.on_completion(completion)?,
            }
        }

        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        tracing::info!("Client stopped");

        Ok(self.surface)
    }

    /// Returns false when the client should stop.
    fn on_surface_event(&mut self, event: SurfaceEvent) -> Result<bool> {
        match event {
            SurfaceEvent::Input(bytes) => match self.lifecycle.send_input(&bytes) {
                Ok(actions) => self.execute(actions)?,
                Err(SessionError::OutboxFull { limit }) => {
                    tracing::warn!(
                        limit,
                        queued = self.lifecycle.queued_bytes(),
                        dropped = bytes.len(),
                        "Input rejected"
                    );
                    self.write_diagnostic(&format!(
                        "❌ Not connected - input buffer full ({} bytes), keystrokes discarded",
                        limit
                    ))?;
                }
                Err(e) => return Err(e.into()),
            },
            SurfaceEvent::Resize { cols, rows } => {
                let actions = self.lifecycle.resize(cols, rows);
                self.execute(actions)?;
            }
            SurfaceEvent::Command(command) => return self.on_command(command),
        }
        Ok(true)
    }

    fn on_command(&mut self, command: Command) -> Result<bool> {
        tracing::debug!(command = ?command, "Command");

        match command {
            Command::NewSession => {
                self.registry.sessions.add_next()?;
            }
            Command::NewWindow => {
                self.registry.windows.add_next()?;
            }
            Command::NextSession => self.cycle(TabKind::Sessions, true),
            Command::PreviousSession => self.cycle(TabKind::Sessions, false),
            Command::NextWindow => self.cycle(TabKind::Windows, true),
            Command::PreviousWindow => self.cycle(TabKind::Windows, false),
            Command::ContainerInfo => {
                let active = self
                    .registry
                    .sessions
                    .active()
                    .and_then(|name| self.registry.sessions.get(&name))
                    .filter(|tab| tab.origin == TabOrigin::Container);
                match active {
                    Some(tab) => {
                        let actions = self.lifecycle.request_container_info(&tab.name);
                        self.execute(actions)?;
                    }
                    None => self.write_diagnostic("❌ No container selected")?,
                }
            }
            Command::ListContainers => {
                let actions = self.lifecycle.request_container_list();
                self.execute(actions)?;
            }
            Command::ListSessions => {
                let actions = self.lifecycle.request_session_list();
                self.execute(actions)?;
            }
            Command::Reconnect => {
                let actions = self.lifecycle.reconnect();
                self.execute(actions)?;
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn cycle(&self, kind: TabKind, forward: bool) {
        let set = self.registry.set(kind);
        let target = if forward {
            set.next_name()
        } else {
            set.previous_name()
        };
        if let Some(name) = target {
            if set.active().as_deref() != Some(name.as_str()) {
                set.select(&name);
            }
        }
    }

    fn on_tab_event(&mut self, event: TabEvent) -> Result<()> {
        let actions = match event {
            TabEvent::Selected {
                kind: TabKind::Sessions,
                name,
                origin,
                ..
            } => {
                if origin == TabOrigin::Container {
                    self.lifecycle.select_container(&name)
                } else {
                    self.registry.follow_session(&name);
                    self.lifecycle.select_session(&name)
                }
            }
            TabEvent::Created {
                kind: TabKind::Sessions,
                name,
                ..
            } => {
                self.registry.follow_session(&name);
                self.lifecycle.create_session(&name)
            }
            TabEvent::Selected {
                kind: TabKind::Windows,
                name,
                session,
                ..
            } => self.lifecycle.select_window(&name, session.as_deref()),
            TabEvent::Created {
                kind: TabKind::Windows,
                name,
                session,
            } => self.lifecycle.create_window(&name, session.as_deref()),
        };

        self.execute(actions)?;
        self.refresh_tabs()
    }

    fn on_completion(&mut self, completion: Completion) -> Result<()> {
        let actions = match completion {
            Completion::SessionCreated { attempt, result } => {
                self.lifecycle.on_session_created(attempt, result)
            }
            Completion::SessionsListed(result) => self.lifecycle.on_sessions_listed(result),
            Completion::Retry(attempt) => self.lifecycle.on_retry(attempt),
        };
        self.execute(actions)
    }

    fn execute(&mut self, actions: Vec<Action>) -> Result<()> {
        for action in actions {
            match action {
                Action::Write(bytes) => self.surface.write(&bytes)?,
                Action::Status { indicator, message } => {
                    self.surface.set_status(indicator, &message)?
                }
                Action::CreateSession { attempt, name } => self.spawn_create(attempt, name),
                Action::FetchSessions => self.spawn_list(),
                Action::Attach {
                    attempt,
                    session_id,
                } => self.attach(attempt, session_id.as_deref())?,
                Action::Close { attempt } => {
                    if let Some(connection) = self.connection.take() {
                        if connection.attempt() == attempt {
                            connection.close();
                        } else {
                            self.connection = Some(connection);
                        }
                    }
                }
                Action::Send { attempt, outgoing } => self.send(attempt, outgoing)?,
                Action::ScheduleRetry { attempt, delay } => {
                    tracing::info!(attempt = %attempt, delay_ms = delay.as_millis() as u64, "Retry scheduled");
                    let tx = self.completion_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Completion::Retry(attempt));
                    });
                }
                Action::Containers {
                    containers,
                    auto_select,
                } => {
                    self.registry
                        .sessions
                        .sync(containers.iter().map(|c| c.name.as_str()), TabOrigin::Container);
                    if let Some(name) = auto_select {
                        self.registry.sessions.select(&name);
                    }
                    self.refresh_tabs()?;
                }
                Action::Sessions { names } => {
                    self.registry.sessions.sync(&names, TabOrigin::Backend);
                    self.refresh_tabs()?;
                }
            }
        }
        Ok(())
    }

    fn attach(&mut self, attempt: AttemptId, session_id: Option<&str>) -> Result<()> {
        let url = self.config.ws_url(session_id)?;
        if let Some(previous) = self.connection.take() {
            previous.close();
        }
        self.connection = Some(Connection::attach(
            url.as_str(),
            attempt,
            self.transport_tx.clone(),
        ));
        Ok(())
    }

    fn send(&mut self, attempt: AttemptId, outgoing: Outgoing) -> Result<()> {
        let result = match &self.connection {
            Some(connection) if connection.attempt() == attempt => match &outgoing {
                Outgoing::Envelope(message) => connection.send(message),
                Outgoing::Raw(bytes) => connection.send_raw(bytes),
                Outgoing::Control(control) => connection.send_control(control),
            },
            Some(connection) => Err(TransportError::NotOpen(connection.state())),
            None => Err(TransportError::Closed),
        };

        match result {
            Ok(()) => Ok(()),
            Err(TransportError::Protocol(e)) => {
                tracing::error!(attempt = %attempt, error = %e, "Failed to encode message");
                Err(e.into())
            }
            Err(e) => {
                tracing::debug!(attempt = %attempt, error = %e, "Send failed");
                let actions = self.lifecycle.on_send_failed(attempt, outgoing);
                self.execute(actions)
            }
        }
    }

    fn spawn_create(&self, attempt: AttemptId, name: String) {
        let api = self.api.clone();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = api
                .create_session(&name)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Completion::SessionCreated { attempt, result });
        });
    }

    fn spawn_list(&self) {
        let api = self.api.clone();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = api.list_sessions().await.map_err(|e| e.to_string());
            let _ = tx.send(Completion::SessionsListed(result));
        });
    }

    fn write_diagnostic(&mut self, text: &str) -> Result<()> {
        self.surface
            .write(format!("\r\n{RED}{text}{RESET}\r\n").as_bytes())?;
        Ok(())
    }

    fn refresh_tabs(&mut self) -> Result<()> {
        let strip = TabStrip {
            sessions: self.registry.sessions.names(),
            active_session: self.registry.sessions.active(),
            windows: self.registry.windows.names(),
            active_window: self.registry.windows.active(),
        };
        self.surface.show_tabs(&strip)?;
        Ok(())
    }
}
