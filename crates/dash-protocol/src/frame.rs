//! Inbound frame classification
//!
//! Binary frames are raw PTY output. Text frames are tried as an envelope
//! first; text that is not a usable envelope still reaches the terminal as
//! raw output, since some backends send unenveloped text.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::message::ServerMessage;

/// One WebSocket message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// What an inbound frame means to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Bytes to write to the terminal as-is
    Output(Vec<u8>),
    /// A structured message
    Message(ServerMessage),
    /// A well-formed envelope of a kind this client does not handle
    Ignored { kind: String },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

pub fn classify_frame(frame: Frame) -> Inbound {
    match frame {
        Frame::Binary(bytes) => Inbound::Output(bytes),
        Frame::Text(text) => match parse_envelope(&text) {
            Some(inbound) => inbound,
            None => Inbound::Output(text.into_bytes()),
        },
    }
}

fn parse_envelope(text: &str) -> Option<Inbound> {
    let envelope: Envelope = serde_json::from_str(text).ok()?;

    let message = match envelope.kind.as_str() {
        "terminal_output" => ServerMessage::TerminalOutput(payload(envelope.payload)?),
        "status" => ServerMessage::Status(payload(envelope.payload)?),
        "error" => ServerMessage::Error(payload(envelope.payload)?),
        "container_list" => ServerMessage::ContainerList(payload(envelope.payload)?),
        "container_info" => ServerMessage::ContainerInfo(payload(envelope.payload)?),
        "session_list" => ServerMessage::SessionList(payload(envelope.payload)?),
        _ => {
            tracing::debug!(kind = %envelope.kind, "Unknown message type");
            return Some(Inbound::Ignored {
                kind: envelope.kind,
            });
        }
    };

    Some(Inbound::Message(message))
}

fn payload<T: DeserializeOwned>(value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::debug!(error = %e, "Envelope payload did not match its type");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContainerInfo, ErrorPayload, StatusPayload};

    fn text(s: &str) -> Inbound {
        classify_frame(Frame::Text(s.to_string()))
    }

    #[test]
    fn test_binary_is_output() {
        let inbound = classify_frame(Frame::Binary(vec![0x1b, b'[', b'H']));
        assert_eq!(inbound, Inbound::Output(vec![0x1b, b'[', b'H']));
    }

    #[test]
    fn test_plain_text_falls_back_to_output() {
        assert_eq!(text("hello"), Inbound::Output(b"hello".to_vec()));
        assert_eq!(
            text("Error: session not found"),
            Inbound::Output(b"Error: session not found".to_vec())
        );
    }

    #[test]
    fn test_json_without_envelope_is_output() {
        assert_eq!(text("[1,2,3]"), Inbound::Output(b"[1,2,3]".to_vec()));
        assert_eq!(text("{\"a\":1}"), Inbound::Output(b"{\"a\":1}".to_vec()));
    }

    #[test]
    fn test_envelope_with_bad_payload_is_output() {
        let raw = r#"{"type":"status","payload":42}"#;
        assert_eq!(text(raw), Inbound::Output(raw.as_bytes().to_vec()));
    }

    #[test]
    fn test_status_and_error() {
        assert_eq!(
            text(r#"{"type":"status","payload":{"connected":true,"message":"Terminal session started"}}"#),
            Inbound::Message(ServerMessage::Status(StatusPayload {
                message: "Terminal session started".to_string(),
                connected: Some(true),
            }))
        );
        assert_eq!(
            text(r#"{"type":"error","payload":{"code":501,"message":"nope"}}"#),
            Inbound::Message(ServerMessage::Error(ErrorPayload {
                code: 501,
                message: "nope".to_string(),
            }))
        );
    }

    #[test]
    fn test_container_list() {
        let inbound = text(
            r#"{"type":"container_list","payload":[{"name":"web-1","status":"running"},{"name":"db-1","status":"stopped","type":"lxc"}]}"#,
        );
        let Inbound::Message(ServerMessage::ContainerList(containers)) = inbound else {
            panic!("expected container list, got {inbound:?}");
        };
        assert_eq!(containers.len(), 2);
        assert!(containers[0].is_running());
        assert_eq!(
            containers[1],
            ContainerInfo {
                name: "db-1".to_string(),
                status: "stopped".to_string(),
                kind: Some("lxc".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        assert_eq!(
            text(r#"{"type":"pane_list","payload":[]}"#),
            Inbound::Ignored {
                kind: "pane_list".to_string()
            }
        );
    }

    #[test]
    fn test_terminal_output_keeps_escapes() {
        assert_eq!(
            text(r#"{"type":"terminal_output","payload":{"data":"\u001b[32mok\u001b[0m"}}"#),
            Inbound::Message(ServerMessage::TerminalOutput(
                crate::message::TerminalOutput {
                    data: "\u{1b}[32mok\u{1b}[0m".to_string()
                }
            ))
        );
    }
}
