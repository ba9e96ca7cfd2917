//! Session Lifecycle
//!
//! Owns the logical connection: which attempt is current, what state it is
//! in and which session it is attached to. Every entry point returns the
//! actions the caller must perform, in order. Completions carry the attempt
//! they belong to; anything from a superseded attempt is dropped here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use dash_protocol::{
    ClientMessage, ContainerInfo, Frame, Inbound, InputDecoder, RawControl, ServerMessage,
};
use dash_transport::{AttemptId, ConnectionEvent, ConnectionState, TransportEvent};

use crate::error::SessionError;
use crate::session::Session;
use crate::state::LifecycleState;
use crate::Result;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// How the client reaches a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningMode {
    /// One always-addressable `/ws` endpoint; containers and sessions are
    /// switched with enveloped control messages.
    #[default]
    Multiplexed,
    /// Each session is created over HTTP and attached with `/ws?session=<id>`;
    /// keystrokes travel as raw bytes.
    HttpSessions,
}

impl ProvisioningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningMode::Multiplexed => "multiplexed",
            ProvisioningMode::HttpSessions => "http_sessions",
        }
    }
}

impl std::fmt::Display for ProvisioningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProvisioningMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "multiplexed" | "ws" => Ok(ProvisioningMode::Multiplexed),
            "http_sessions" | "http" => Ok(ProvisioningMode::HttpSessions),
            _ => Err(format!("Unknown provisioning mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub mode: ProvisioningMode,
    /// Name used when provisioning a session over HTTP
    pub session_name: String,
    pub retry_delay: Duration,
    /// Upper bound on keystroke bytes held while disconnected
    pub outbox_limit: usize,
    /// Select the first running container when the backend lists them
    pub auto_select_running: bool,
    /// Pane id attached to enveloped input
    pub pane_id: Option<String>,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            mode: ProvisioningMode::default(),
            session_name: "default".to_string(),
            retry_delay: Duration::from_millis(3000),
            outbox_limit: 64 * 1024,
            auto_select_running: true,
            pane_id: Some("main".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Connecting,
    Connected,
    Disconnected,
}

impl StatusIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusIndicator::Connecting => "connecting",
            StatusIndicator::Connected => "connected",
            StatusIndicator::Disconnected => "disconnected",
        }
    }
}

/// A payload for the current connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Envelope(ClientMessage),
    Raw(Vec<u8>),
    Control(RawControl),
}

impl Outgoing {
    fn is_input(&self) -> bool {
        matches!(
            self,
            Outgoing::Raw(_) | Outgoing::Envelope(ClientMessage::TerminalInput { .. })
        )
    }

    fn input_len(&self) -> usize {
        match self {
            Outgoing::Raw(bytes) => bytes.len(),
            Outgoing::Envelope(ClientMessage::TerminalInput { data, .. }) => data.len(),
            _ => 0,
        }
    }
}

/// Work the caller performs on behalf of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Provision a session over HTTP and report back with `on_session_created`
    CreateSession { attempt: AttemptId, name: String },
    /// Open a WebSocket for this attempt
    Attach {
        attempt: AttemptId,
        session_id: Option<String>,
    },
    /// Close the connection belonging to a superseded attempt
    Close { attempt: AttemptId },
    Send {
        attempt: AttemptId,
        outgoing: Outgoing,
    },
    /// Call `on_retry` with this attempt after `delay`
    ScheduleRetry { attempt: AttemptId, delay: Duration },
    /// Bytes for the terminal surface
    Write(Vec<u8>),
    Status {
        indicator: StatusIndicator,
        message: String,
    },
    /// Backend reported its containers; `auto_select` names the one to pick
    Containers {
        containers: Vec<ContainerInfo>,
        auto_select: Option<String>,
    },
    /// List sessions over HTTP and report back with `on_sessions_listed`
    FetchSessions,
    /// Backend reported its sessions
    Sessions { names: Vec<String> },
}

impl Action {
    fn write(text: impl Into<String>) -> Self {
        Action::Write(text.into().into_bytes())
    }

    fn diagnostic(text: impl std::fmt::Display) -> Self {
        Action::write(format!("{RED}{text}{RESET}\r\n"))
    }
}

/// The logical connection of the current attempt.
#[derive(Debug, Clone)]
struct ConnectionSlot {
    attempt: AttemptId,
    state: ConnectionState,
    session_id: Option<String>,
}

pub struct SessionLifecycle {
    options: LifecycleOptions,
    state: LifecycleState,
    attempt: AttemptId,
    connection: Option<ConnectionSlot>,
    /// Sessions provisioned over HTTP, by name
    sessions: HashMap<String, Session>,
    /// Session the next HTTP attempt attaches to or creates
    target_session: String,
    outbox: VecDeque<Outgoing>,
    outbox_bytes: usize,
    /// Where the next failed send goes back into the outbox. Failed sends
    /// were issued before anything queued while disconnected.
    requeue_at: usize,
    decoder: InputDecoder,
    last_size: Option<(u16, u16)>,
}

impl SessionLifecycle {
    pub fn new(options: LifecycleOptions) -> Self {
        let target_session = options.session_name.clone();

        Self {
            options,
            state: LifecycleState::Idle,
            attempt: AttemptId::default(),
            connection: None,
            sessions: HashMap::new(),
            target_session,
            outbox: VecDeque::new(),
            outbox_bytes: 0,
            requeue_at: 0,
            decoder: InputDecoder::new(),
            last_size: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn mode(&self) -> ProvisioningMode {
        self.options.mode
    }

    pub fn is_attached(&self) -> bool {
        self.state == LifecycleState::Attached
            && self
                .connection
                .as_ref()
                .is_some_and(|c| c.state == ConnectionState::Open)
    }

    /// Keystroke bytes waiting for a connection
    pub fn queued_bytes(&self) -> usize {
        self.outbox_bytes
    }

    pub fn start(&mut self) -> Vec<Action> {
        if self.state != LifecycleState::Idle {
            tracing::debug!(state = %self.state, "Lifecycle already started");
            return Vec::new();
        }
        let mut actions = Vec::new();
        self.begin_attempt(&mut actions);
        actions
    }

    /// Abandon whatever is in flight and start over right away.
    pub fn reconnect(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::write("\r\n🔄 Reconnecting...\r\n")];
        self.begin_attempt(&mut actions);
        actions
    }

    pub fn on_session_created(
        &mut self,
        attempt: AttemptId,
        result: std::result::Result<Session, String>,
    ) -> Vec<Action> {
        if !self.is_current(attempt, "session created") || self.state != LifecycleState::Creating
        {
            return Vec::new();
        }

        let mut actions = Vec::new();
        match result {
            Ok(session) => {
                tracing::info!(
                    attempt = %attempt,
                    session_id = %session.id,
                    name = %session.name,
                    "Session provisioned"
                );
                let session_id = session.id.clone();
                self.sessions.insert(self.target_session.clone(), session);
                self.attach(attempt, Some(session_id), &mut actions);
            }
            Err(reason) => {
                tracing::warn!(attempt = %attempt, error = %reason, "Session creation failed");
                actions.push(Action::diagnostic(format!(
                    "❌ Failed to create session: {reason}"
                )));
                self.enter_lost("Session creation failed", &mut actions);
            }
        }
        actions
    }

    pub fn on_transport(&mut self, event: ConnectionEvent) -> Vec<Action> {
        let ConnectionEvent { attempt, event } = event;
        // Keystrokes outlive the connection that failed to carry them
        if let TransportEvent::Undelivered(frames) = event {
            return self.on_undelivered(attempt, frames);
        }
        if !self.is_current(attempt, "transport event") {
            return Vec::new();
        }

        let mut actions = Vec::new();
        match event {
            TransportEvent::Opened => self.on_opened(&mut actions),
            TransportEvent::Inbound(inbound) => self.dispatch(inbound, &mut actions),
            TransportEvent::Error(reason) => {
                tracing::warn!(attempt = %attempt, error = %reason, "WebSocket error");
                actions.push(Action::write("❌ WebSocket error\r\n"));
            }
            TransportEvent::Undelivered(_) => {}
            TransportEvent::Closed { reason } => {
                if let Some(slot) = self.connection.as_mut() {
                    slot.state = ConnectionState::Closed;
                }
                if matches!(
                    self.state,
                    LifecycleState::Attaching | LifecycleState::Attached
                ) {
                    tracing::info!(attempt = %attempt, reason = ?reason, "Connection lost");
                    actions.push(Action::write("\r\n❌ WebSocket disconnected\r\n"));
                    self.enter_lost("Disconnected", &mut actions);
                }
            }
        }
        actions
    }

    pub fn on_retry(&mut self, attempt: AttemptId) -> Vec<Action> {
        if !self.is_current(attempt, "retry timer") || self.state != LifecycleState::Lost {
            return Vec::new();
        }
        tracing::info!(attempt = %attempt, "Retrying");
        let mut actions = Vec::new();
        self.begin_attempt(&mut actions);
        actions
    }

    /// The caller could not hand `outgoing` to the connection of `attempt`.
    /// Call once per payload, in the order they were sent.
    pub fn on_send_failed(&mut self, attempt: AttemptId, outgoing: Outgoing) -> Vec<Action> {
        if !outgoing.is_input() {
            tracing::warn!(attempt = %attempt, outgoing = ?outgoing, "Dropped control message");
            return vec![Action::diagnostic(
                "❌ Message not delivered - WebSocket not connected",
            )];
        }

        if attempt == self.attempt {
            if let Some(slot) = self.connection.as_mut() {
                slot.state = ConnectionState::Closed;
            }
        } else if self.is_attached() {
            // A superseded connection gave the input back after its successor opened
            tracing::debug!(attempt = %attempt, current = %self.attempt, "Resending input on current connection");
            return vec![Action::Send {
                attempt: self.attempt,
                outgoing,
            }];
        }

        let len = outgoing.input_len();
        if self.outbox_bytes + len > self.options.outbox_limit {
            tracing::warn!(
                attempt = %attempt,
                dropped = len,
                queued = self.outbox_bytes,
                "Input buffer full, dropping failed send"
            );
            return vec![Action::diagnostic(format!(
                "❌ Not connected - input buffer full ({} bytes), keystrokes discarded",
                self.options.outbox_limit
            ))];
        }

        tracing::debug!(attempt = %attempt, bytes = len, "Requeueing input after failed send");
        let at = self.requeue_at.min(self.outbox.len());
        self.outbox.insert(at, outgoing);
        self.requeue_at = at + 1;
        self.outbox_bytes += len;
        Vec::new()
    }

    /// Frames a closing connection never wrote, in send order.
    fn on_undelivered(&mut self, attempt: AttemptId, frames: Vec<Frame>) -> Vec<Action> {
        let mut actions = Vec::new();
        for frame in frames {
            let outgoing = match frame {
                Frame::Binary(bytes) => Outgoing::Raw(bytes),
                Frame::Text(text) => match ClientMessage::from_text(&text) {
                    Ok(message) => Outgoing::Envelope(message),
                    Err(_) => {
                        // Raw resize; the latest size is replayed on attach
                        tracing::debug!(attempt = %attempt, text = %text, "Dropping undelivered control frame");
                        continue;
                    }
                },
            };
            if matches!(outgoing, Outgoing::Envelope(ClientMessage::TerminalResize { .. })) {
                continue;
            }
            for action in self.on_send_failed(attempt, outgoing) {
                // One notice per batch is enough
                if matches!(action, Action::Write(_)) && actions.contains(&action) {
                    continue;
                }
                actions.push(action);
            }
        }
        actions
    }

    /// Keystrokes from the terminal surface. Sent when attached, queued
    /// otherwise; fails only when the queue is full.
    pub fn send_input(&mut self, bytes: &[u8]) -> Result<Vec<Action>> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let Some(outgoing) = self.input_outgoing(bytes) else {
            return Ok(Vec::new());
        };

        if self.is_attached() {
            return Ok(vec![Action::Send {
                attempt: self.attempt,
                outgoing,
            }]);
        }

        let len = outgoing.input_len();
        if self.outbox_bytes + len > self.options.outbox_limit {
            return Err(SessionError::OutboxFull {
                limit: self.options.outbox_limit,
            });
        }
        self.outbox_bytes += len;
        self.outbox.push_back(outgoing);
        tracing::trace!(queued = self.outbox_bytes, "Queued input while disconnected");
        Ok(Vec::new())
    }

    /// Viewport size change. Only the latest size is kept while disconnected.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Vec<Action> {
        self.last_size = Some((cols, rows));
        if !self.is_attached() {
            return Vec::new();
        }
        vec![Action::Send {
            attempt: self.attempt,
            outgoing: self.resize_outgoing(cols, rows),
        }]
    }

    /// Switch the backend to another session without reconnecting.
    pub fn select_session(&mut self, name: &str) -> Vec<Action> {
        match self.options.mode {
            ProvisioningMode::Multiplexed => self.send_control(
                ClientMessage::SessionSelect {
                    name: name.to_string(),
                },
                format!("\r\n🔄 Switching to session: {name}\r\n"),
                "❌ Cannot switch session - WebSocket not connected",
            ),
            ProvisioningMode::HttpSessions => {
                if self.target_session == name && self.state != LifecycleState::Lost {
                    return Vec::new();
                }
                self.target_session = name.to_string();
                if self.is_attached() {
                    return self.send_control(
                        ClientMessage::SessionSelect {
                            name: name.to_string(),
                        },
                        format!("\r\n🔄 Switching to session: {name}\r\n"),
                        "❌ Cannot switch session - WebSocket not connected",
                    );
                }
                let mut actions = vec![Action::write(format!(
                    "\r\n🔄 Switching to session: {name}\r\n"
                ))];
                self.begin_attempt(&mut actions);
                actions
            }
        }
    }

    /// Point the current connection at another container.
    pub fn select_container(&mut self, name: &str) -> Vec<Action> {
        self.send_control(
            ClientMessage::ContainerSelect {
                container_name: name.to_string(),
            },
            format!("\r\n🔄 Connecting to container: {name}\r\n"),
            "❌ Cannot switch container - WebSocket not connected",
        )
    }

    pub fn request_container_info(&mut self, name: &str) -> Vec<Action> {
        self.send_control(
            ClientMessage::ContainerInfo {
                container_name: name.to_string(),
            },
            String::new(),
            "❌ Cannot query container - WebSocket not connected",
        )
    }

    pub fn request_container_list(&mut self) -> Vec<Action> {
        self.send_control(
            ClientMessage::ContainerList {},
            String::new(),
            "❌ Cannot list containers - WebSocket not connected",
        )
    }

    /// Multiplexed backends answer over the socket; HTTP backends list
    /// sessions at the provisioning endpoint, which works while disconnected.
    pub fn request_session_list(&mut self) -> Vec<Action> {
        match self.options.mode {
            ProvisioningMode::Multiplexed => self.send_control(
                ClientMessage::SessionList {},
                String::new(),
                "❌ Cannot list sessions - WebSocket not connected",
            ),
            ProvisioningMode::HttpSessions => vec![Action::FetchSessions],
        }
    }

    /// Result of an HTTP session listing. Listed sessions are reattached by
    /// id instead of being provisioned again.
    pub fn on_sessions_listed(
        &mut self,
        result: std::result::Result<Vec<Session>, String>,
    ) -> Vec<Action> {
        let sessions = match result {
            Ok(sessions) => sessions,
            Err(reason) => {
                tracing::warn!(error = %reason, "Session listing failed");
                return vec![Action::diagnostic(format!(
                    "❌ Failed to list sessions: {reason}"
                ))];
            }
        };

        let mut listing = String::from("📋 Sessions:\r\n");
        let mut names = Vec::with_capacity(sessions.len());
        for session in sessions {
            let name = session.display_name().to_string();
            listing.push_str(&format!("  {name} ({})\r\n", session.id));
            names.push(name.clone());
            self.sessions.insert(name, session);
        }
        tracing::debug!(count = names.len(), "Sessions listed");

        vec![Action::write(listing), Action::Sessions { names }]
    }

    /// A new session tab was added.
    pub fn create_session(&mut self, name: &str) -> Vec<Action> {
        match self.options.mode {
            ProvisioningMode::Multiplexed => self.send_control(
                ClientMessage::SessionCreate {
                    name: name.to_string(),
                },
                format!("\r\n➕ Session creation requested: {name}\r\n"),
                "❌ Cannot create session - WebSocket not connected",
            ),
            ProvisioningMode::HttpSessions => {
                self.target_session = name.to_string();
                self.sessions.remove(name);
                let mut actions = vec![Action::write(format!(
                    "\r\n➕ Session creation requested: {name}\r\n"
                ))];
                self.begin_attempt(&mut actions);
                actions
            }
        }
    }

    /// Windows are switched locally; the backend has no window selection.
    pub fn select_window(&mut self, name: &str, session: Option<&str>) -> Vec<Action> {
        tracing::debug!(window = %name, session = ?session, "Window selected");
        vec![Action::write(format!("\r\n🪟 Window switched to: {name}\r\n"))]
    }

    pub fn create_window(&mut self, name: &str, session: Option<&str>) -> Vec<Action> {
        tracing::debug!(window = %name, session = ?session, "Window creation requested");
        vec![Action::write(format!(
            "\r\n➕ Window creation requested: {name}\r\n"
        ))]
    }

    fn begin_attempt(&mut self, actions: &mut Vec<Action>) {
        if self.state.is_pending() {
            tracing::debug!(attempt = %self.attempt, state = %self.state, "Superseding in-flight attempt");
        }
        if let Some(slot) = self.connection.take() {
            if slot.state != ConnectionState::Closed {
                actions.push(Action::Close {
                    attempt: slot.attempt,
                });
            }
        }

        self.attempt = self.attempt.next();
        let attempt = self.attempt;

        match self.options.mode {
            ProvisioningMode::HttpSessions => {
                if let Some(session) = self.sessions.get(&self.target_session) {
                    let session_id = session.id.clone();
                    self.attach(attempt, Some(session_id), actions);
                    return;
                }
                self.transition(LifecycleState::Creating);
                actions.push(Action::Status {
                    indicator: StatusIndicator::Connecting,
                    message: "Creating session...".to_string(),
                });
                actions.push(Action::CreateSession {
                    attempt,
                    name: self.target_session.clone(),
                });
            }
            ProvisioningMode::Multiplexed => self.attach(attempt, None, actions),
        }
    }

    fn attach(&mut self, attempt: AttemptId, session_id: Option<String>, actions: &mut Vec<Action>) {
        self.transition(LifecycleState::Attaching);
        self.connection = Some(ConnectionSlot {
            attempt,
            state: ConnectionState::Connecting,
            session_id: session_id.clone(),
        });
        actions.push(Action::Status {
            indicator: StatusIndicator::Connecting,
            message: "Connecting...".to_string(),
        });
        actions.push(Action::Attach {
            attempt,
            session_id,
        });
    }

    fn on_opened(&mut self, actions: &mut Vec<Action>) {
        if self.state != LifecycleState::Attaching {
            return;
        }
        if let Some(slot) = self.connection.as_mut() {
            slot.state = ConnectionState::Open;
            tracing::info!(attempt = %slot.attempt, session_id = ?slot.session_id, "Attached");
        }
        self.transition(LifecycleState::Attached);

        actions.push(Action::Status {
            indicator: StatusIndicator::Connected,
            message: "Connected".to_string(),
        });
        actions.push(Action::write("✅ WebSocket connected\r\n"));

        let attempt = self.attempt;
        if self.options.mode == ProvisioningMode::Multiplexed {
            actions.push(Action::Send {
                attempt,
                outgoing: Outgoing::Envelope(ClientMessage::ContainerList {}),
            });
        }
        if let Some((cols, rows)) = self.last_size {
            actions.push(Action::Send {
                attempt,
                outgoing: self.resize_outgoing(cols, rows),
            });
        }

        if !self.outbox.is_empty() {
            tracing::debug!(attempt = %attempt, bytes = self.outbox_bytes, "Flushing queued input");
        }
        self.outbox_bytes = 0;
        self.requeue_at = 0;
        actions.extend(
            self.outbox
                .drain(..)
                .map(|outgoing| Action::Send { attempt, outgoing }),
        );
    }

    fn dispatch(&mut self, inbound: Inbound, actions: &mut Vec<Action>) {
        match inbound {
            Inbound::Output(bytes) => actions.push(Action::Write(bytes)),
            Inbound::Ignored { kind } => {
                tracing::debug!(kind = %kind, "Ignoring message");
            }
            Inbound::Message(message) => match message {
                ServerMessage::TerminalOutput(output) => actions.push(Action::write(output.data)),
                ServerMessage::Status(status) => {
                    tracing::info!(message = %status.message, "Backend status");
                    actions.push(Action::write(format!("📟 {}\r\n", status.message)));
                }
                ServerMessage::Error(error) => {
                    tracing::warn!(code = error.code, message = %error.message, "Backend error");
                    actions.push(Action::diagnostic(format!(
                        "❌ Error {}: {}",
                        error.code, error.message
                    )));
                }
                ServerMessage::ContainerInfo(container) => {
                    actions.push(Action::write(format!(
                        "📊 Container: {}\r\n   Status: {}\r\n   Type: {}\r\n\r\n",
                        container.name,
                        container.status,
                        container.kind.as_deref().unwrap_or("unknown")
                    )));
                }
                ServerMessage::ContainerList(containers) => {
                    self.on_container_list(containers, actions)
                }
                ServerMessage::SessionList(sessions) => actions.push(Action::Sessions {
                    names: sessions.into_iter().map(|s| s.name).collect(),
                }),
            },
        }
    }

    fn on_container_list(&mut self, containers: Vec<ContainerInfo>, actions: &mut Vec<Action>) {
        let mut listing = String::from("📦 Available containers:\r\n");
        for container in &containers {
            let marker = if container.is_running() { "🟢" } else { "🔴" };
            listing.push_str(&format!(
                "  {marker} {} ({})\r\n",
                container.name, container.status
            ));
        }
        actions.push(Action::write(listing));

        let first_running = containers
            .iter()
            .find(|c| c.is_running())
            .map(|c| c.name.clone());

        let auto_select = if self.options.auto_select_running {
            match &first_running {
                Some(name) => {
                    actions.push(Action::write(format!(
                        "\r\n🔄 Auto-connecting to {name}...\r\n"
                    )));
                }
                None => actions.push(Action::write(
                    "\r\n❌ No running containers found\r\n💡 Start a container to use the terminal\r\n",
                )),
            }
            first_running
        } else {
            None
        };

        actions.push(Action::Containers {
            containers,
            auto_select,
        });
    }

    fn send_control(
        &mut self,
        message: ClientMessage,
        notice: String,
        unavailable: &str,
    ) -> Vec<Action> {
        if !self.is_attached() {
            tracing::debug!(kind = message.kind(), state = %self.state, "Control message while not attached");
            return vec![Action::write(format!("\r\n{unavailable}\r\n"))];
        }

        let mut actions = vec![Action::Send {
            attempt: self.attempt,
            outgoing: Outgoing::Envelope(message),
        }];
        if !notice.is_empty() {
            actions.push(Action::write(notice));
        }
        actions
    }

    fn enter_lost(&mut self, message: &str, actions: &mut Vec<Action>) {
        self.transition(LifecycleState::Lost);
        actions.push(Action::Status {
            indicator: StatusIndicator::Disconnected,
            message: message.to_string(),
        });
        actions.push(Action::ScheduleRetry {
            attempt: self.attempt,
            delay: self.options.retry_delay,
        });
    }

    /// None while the bytes so far end inside a character.
    fn input_outgoing(&mut self, bytes: &[u8]) -> Option<Outgoing> {
        match self.options.mode {
            ProvisioningMode::Multiplexed => {
                let data = self.decoder.decode(bytes);
                if data.is_empty() {
                    tracing::trace!(pending = self.decoder.pending(), "Holding partial character");
                    return None;
                }
                Some(Outgoing::Envelope(ClientMessage::input(
                    self.options.pane_id.as_deref(),
                    data,
                )))
            }
            ProvisioningMode::HttpSessions => Some(Outgoing::Raw(bytes.to_vec())),
        }
    }

    fn resize_outgoing(&self, cols: u16, rows: u16) -> Outgoing {
        match self.options.mode {
            ProvisioningMode::Multiplexed => Outgoing::Envelope(ClientMessage::TerminalResize {
                width: cols,
                height: rows,
            }),
            ProvisioningMode::HttpSessions => Outgoing::Control(RawControl::Resize {
                width: cols,
                height: rows,
            }),
        }
    }

    fn is_current(&self, attempt: AttemptId, what: &str) -> bool {
        if attempt != self.attempt {
            tracing::debug!(
                attempt = %attempt,
                current = %self.attempt,
                what = %what,
                "Discarding completion from superseded attempt"
            );
            return false;
        }
        true
    }

    fn transition(&mut self, to: LifecycleState) {
        if !self.state.can_transition_to(to) {
            tracing::warn!(from = %self.state, to = %to, "Unexpected lifecycle transition");
        }
        tracing::debug!(attempt = %self.attempt, from = %self.state, to = %to, "Lifecycle transition");
        self.state = to;
    }
}
