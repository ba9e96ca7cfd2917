//! WebSocket connection
//!
//! `Connection::attach` returns immediately; the handshake and the socket
//! loop run on a spawned task. Failures only surface as `Error`/`Closed`
//! events, never as a return value of `attach`.

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use dash_protocol::{classify_frame, ClientMessage, Frame, Inbound, RawControl};

use crate::attempt::AttemptId;
use crate::error::TransportError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Inbound(Inbound),
    Error(String),
    /// Frames accepted by `send*` that never reached the socket, in the
    /// order they were sent. Always followed by `Closed`.
    Undelivered(Vec<Frame>),
    Closed { reason: Option<String> },
}

/// A transport event and the attempt whose connection produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub attempt: AttemptId,
    pub event: TransportEvent,
}

#[derive(Debug)]
enum Outbound {
    Frame(Frame),
    Close,
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}

pub struct Connection {
    attempt: AttemptId,
    state: Arc<RwLock<ConnectionState>>,
    outbound: UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

impl Connection {
    /// Start connecting to `url`. Must be called inside a tokio runtime.
    pub fn attach(
        url: impl Into<String>,
        attempt: AttemptId,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Self {
        let url = url.into();
        let state = Arc::new(RwLock::new(ConnectionState::Connecting));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tracing::info!(attempt = %attempt, url = %url, "Attaching WebSocket");

        let task = tokio::spawn(run_socket(
            url,
            attempt,
            Arc::clone(&state),
            outbound_rx,
            events,
        ));

        Self {
            attempt,
            state,
            outbound,
            task,
        }
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Send an enveloped message as a text frame.
    pub fn send(&self, message: &ClientMessage) -> Result<()> {
        let text = message.to_text()?;
        self.push(Frame::Text(text))
    }

    /// Send unframed bytes as a binary frame.
    pub fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        self.push(Frame::Binary(bytes.to_vec()))
    }

    /// Send a flat control object on a raw connection.
    pub fn send_control(&self, control: &RawControl) -> Result<()> {
        let text = control.to_text()?;
        self.push(Frame::Text(text))
    }

    /// Ask the socket to close. Idempotent.
    pub fn close(&self) {
        if self.state() != ConnectionState::Closed {
            tracing::debug!(attempt = %self.attempt, "Closing connection");
        }
        let _ = self.outbound.send(Outbound::Close);
    }

    fn push(&self, frame: Frame) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(TransportError::NotOpen(state));
        }
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
        if self.state() == ConnectionState::Connecting {
            self.task.abort();
        }
    }
}

async fn run_socket(
    url: String,
    attempt: AttemptId,
    state: Arc<RwLock<ConnectionState>>,
    mut outbound: UnboundedReceiver<Outbound>,
    events: UnboundedSender<ConnectionEvent>,
) {
    let emit = |event: TransportEvent| {
        let _ = events.send(ConnectionEvent { attempt, event });
    };

    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            tracing::warn!(attempt = %attempt, error = %e, "WebSocket connect failed");
            *state.write() = ConnectionState::Closed;
            emit(TransportEvent::Error(e.to_string()));
            emit(TransportEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };

    *state.write() = ConnectionState::Open;
    tracing::info!(attempt = %attempt, "WebSocket connected");
    emit(TransportEvent::Opened);

    let (mut sink, mut stream) = socket.split();

    let mut failed = None;
    let reason = loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = sink.send(to_message(frame.clone())).await {
                        tracing::warn!(attempt = %attempt, error = %e, "WebSocket send failed");
                        emit(TransportEvent::Error(e.to_string()));
                        failed = Some(frame);
                        break Some(e.to_string());
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break Some("closed by client".to_string());
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEvent::Inbound(classify_frame(Frame::Text(text))));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    emit(TransportEvent::Inbound(classify_frame(Frame::Binary(bytes))));
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                }
                // Pings are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(attempt = %attempt, error = %e, "WebSocket read failed");
                    emit(TransportEvent::Error(e.to_string()));
                    break Some(e.to_string());
                }
                None => break None,
            },
        }
    };

    *state.write() = ConnectionState::Closed;
    let undelivered = drain_undelivered(failed, &mut outbound);
    if !undelivered.is_empty() {
        tracing::debug!(attempt = %attempt, frames = undelivered.len(), "Returning undelivered frames");
        emit(TransportEvent::Undelivered(undelivered));
    }
    tracing::info!(attempt = %attempt, reason = ?reason, "WebSocket disconnected");
    emit(TransportEvent::Closed { reason });
}

/// Collect the frame whose send failed and everything still queued behind
/// it. Closes the queue first so a concurrent `push` fails instead of
/// landing after the drain.
fn drain_undelivered(
    failed: Option<Frame>,
    outbound: &mut UnboundedReceiver<Outbound>,
) -> Vec<Frame> {
    outbound.close();
    let mut frames: Vec<Frame> = failed.into_iter().collect();
    while let Ok(queued) = outbound.try_recv() {
        if let Outbound::Frame(frame) = queued {
            frames.push(frame);
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn next_event(rx: &mut UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed")
    }

    #[test]
    fn test_drain_keeps_send_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(Outbound::Frame(Frame::Binary(b"b".to_vec()))).unwrap();
        tx.send(Outbound::Close).unwrap();
        tx.send(Outbound::Frame(Frame::Text("c".to_string()))).unwrap();

        let frames = drain_undelivered(Some(Frame::Binary(b"a".to_vec())), &mut rx);

        assert_eq!(
            frames,
            vec![
                Frame::Binary(b"a".to_vec()),
                Frame::Binary(b"b".to_vec()),
                Frame::Text("c".to_string()),
            ]
        );
        // The queue is closed, so late sends are refused rather than lost
        assert!(tx.send(Outbound::Frame(Frame::Binary(b"d".to_vec()))).is_err());
    }

    #[test]
    fn test_drain_with_nothing_pending() {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        assert!(drain_undelivered(None, &mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_send_before_open_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let (tx, _rx) = mpsc::unbounded_channel();

        let connection = Connection::attach(url, AttemptId::default().next(), tx);
        let result = connection.send(&ClientMessage::ContainerList {});

        assert!(matches!(
            result,
            Err(TransportError::NotOpen(ConnectionState::Connecting))
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_as_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let attempt = AttemptId::default().next();
        let connection = Connection::attach(format!("ws://{}/ws", addr), attempt, tx);

        let first = next_event(&mut rx).await;
        assert_eq!(first.attempt, attempt);
        assert!(matches!(first.event, TransportEvent::Error(_)));
        let second = next_event(&mut rx).await;
        assert!(matches!(second.event, TransportEvent::Closed { .. }));
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_loopback_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text("hello".to_string())).await.unwrap();
            ws.send(Message::Binary(b"\x1b[1mbold".to_vec())).await.unwrap();
            let received = loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => break text,
                    Some(Ok(_)) => continue,
                    other => panic!("unexpected message: {other:?}"),
                }
            };
            ws.close(None).await.unwrap();
            received
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = Connection::attach(url, AttemptId::default().next(), tx);

        assert_eq!(next_event(&mut rx).await.event, TransportEvent::Opened);
        assert!(connection.is_open());
        assert_eq!(
            next_event(&mut rx).await.event,
            TransportEvent::Inbound(Inbound::Output(b"hello".to_vec()))
        );
        assert_eq!(
            next_event(&mut rx).await.event,
            TransportEvent::Inbound(Inbound::Output(b"\x1b[1mbold".to_vec()))
        );

        connection
            .send(&ClientMessage::ContainerSelect {
                container_name: "web-1".to_string(),
            })
            .unwrap();

        let received = timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&received).unwrap();
        assert_eq!(value["type"], "container_select");
        assert_eq!(value["payload"]["container_name"], "web-1");

        loop {
            match next_event(&mut rx).await.event {
                TransportEvent::Closed { .. } => break,
                TransportEvent::Error(_) => continue,
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert!(matches!(
            connection.send_raw(b"x"),
            Err(TransportError::NotOpen(ConnectionState::Closed))
        ));
    }
}
