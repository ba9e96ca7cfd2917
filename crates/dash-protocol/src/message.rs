//! Envelope message types
//!
//! Every structured message is `{"type": "<kind>", "payload": {...}}`.
//! Resize uses `terminal_resize {width, height}` in the envelope and a flat
//! `{"type": "resize", "width", "height"}` object on raw connections.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Messages the client sends to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    ContainerList {},
    ContainerSelect {
        container_name: String,
    },
    ContainerInfo {
        container_name: String,
    },
    SessionList {},
    SessionSelect {
        name: String,
    },
    SessionCreate {
        name: String,
    },
    TerminalInput {
        #[serde(skip_serializing_if = "Option::is_none")]
        pane_id: Option<String>,
        data: String,
    },
    TerminalResize {
        width: u16,
        height: u16,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::ContainerList {} => "container_list",
            ClientMessage::ContainerSelect { .. } => "container_select",
            ClientMessage::ContainerInfo { .. } => "container_info",
            ClientMessage::SessionList {} => "session_list",
            ClientMessage::SessionSelect { .. } => "session_select",
            ClientMessage::SessionCreate { .. } => "session_create",
            ClientMessage::TerminalInput { .. } => "terminal_input",
            ClientMessage::TerminalResize { .. } => "terminal_resize",
        }
    }

    /// Serialize into the text of a single frame.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn input(pane_id: Option<&str>, data: impl Into<String>) -> Self {
        ClientMessage::TerminalInput {
            pane_id: pane_id.map(str::to_string),
            data: data.into(),
        }
    }

    /// Parse the text of a frame this client produced.
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Turns keystroke chunks into text for `terminal_input`.
///
/// A character split across two chunks is held back until its remaining
/// bytes arrive. Bytes that can never be valid UTF-8 become U+FFFD.
#[derive(Debug, Default)]
pub struct InputDecoder {
    pending: Vec<u8>,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        loop {
            let error = match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    return text;
                }
                Err(error) => error,
            };
            let valid_up_to = error.valid_up_to();
            text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
            match error.error_len() {
                Some(len) => {
                    text.push(char::REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid_up_to + len);
                }
                None => {
                    self.pending.drain(..valid_up_to);
                    return text;
                }
            }
        }
    }

    /// Bytes held back waiting for the rest of a character
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Control messages on raw connections, sent as flat JSON text frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawControl {
    Resize { width: u16, height: u16 },
}

impl RawControl {
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages the backend sends to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    TerminalOutput(TerminalOutput),
    Status(StatusPayload),
    Error(ErrorPayload),
    ContainerList(Vec<ContainerInfo>),
    ContainerInfo(ContainerInfo),
    SessionList(Vec<SessionSummary>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalOutput {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub status: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn encoded(message: &ClientMessage) -> Value {
        serde_json::from_str(&message.to_text().unwrap()).unwrap()
    }

    #[test]
    fn test_container_list_request_has_empty_payload() {
        let value = encoded(&ClientMessage::ContainerList {});
        assert_eq!(value, json!({"type": "container_list", "payload": {}}));
    }

    #[test]
    fn test_container_select_shape() {
        let value = encoded(&ClientMessage::ContainerSelect {
            container_name: "web-1".to_string(),
        });
        assert_eq!(
            value,
            json!({"type": "container_select", "payload": {"container_name": "web-1"}})
        );
    }

    #[test]
    fn test_terminal_input_omits_missing_pane() {
        let with_pane = encoded(&ClientMessage::input(Some("main"), "ls\r"));
        assert_eq!(
            with_pane,
            json!({"type": "terminal_input", "payload": {"pane_id": "main", "data": "ls\r"}})
        );

        let without_pane = encoded(&ClientMessage::input(None, "x"));
        assert_eq!(
            without_pane,
            json!({"type": "terminal_input", "payload": {"data": "x"}})
        );
    }

    #[test]
    fn test_resize_shapes() {
        let enveloped = encoded(&ClientMessage::TerminalResize {
            width: 120,
            height: 40,
        });
        assert_eq!(
            enveloped,
            json!({"type": "terminal_resize", "payload": {"width": 120, "height": 40}})
        );

        let raw: Value = serde_json::from_str(
            &RawControl::Resize {
                width: 80,
                height: 24,
            }
            .to_text()
            .unwrap(),
        )
        .unwrap();
        assert_eq!(raw, json!({"type": "resize", "width": 80, "height": 24}));
    }

    #[test]
    fn test_split_character_is_held_until_complete() {
        let bytes = "é".as_bytes();
        let mut decoder = InputDecoder::new();

        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.pending(), 1);
        assert_eq!(decoder.decode(&bytes[1..]), "é");
        assert_eq!(decoder.pending(), 0);

        let mut bytes = b"ab".to_vec();
        bytes.extend_from_slice(&"日".as_bytes()[..2]);
        assert_eq!(decoder.decode(&bytes), "ab");
        assert_eq!(decoder.decode(&"日".as_bytes()[2..]), "日");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = InputDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{fffd}b");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_envelope_parses_back() {
        let message = ClientMessage::input(Some("main"), "ls\r");
        assert_eq!(
            ClientMessage::from_text(&message.to_text().unwrap()).unwrap(),
            message
        );
        assert_eq!(
            ClientMessage::from_text(r#"{"type":"container_list","payload":{}}"#).unwrap(),
            ClientMessage::ContainerList {}
        );
        assert!(ClientMessage::from_text(r#"{"type":"resize","width":80,"height":24}"#).is_err());
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        let message = ClientMessage::SessionSelect {
            name: "work".to_string(),
        };
        assert_eq!(encoded(&message)["type"], message.kind());
    }
}
