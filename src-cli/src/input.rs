//! Keyboard input
//!
//! Converts crossterm events into surface events. Keys go to the remote
//! terminal as bytes, except after the prefix key (Ctrl-B), where the next
//! key is a local tab command.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use dash_core::{Command, SurfaceEvent};

/// Byte sent for the prefix key when it is pressed twice
const PREFIX_BYTE: u8 = 0x02;

/// Convert a key event to bytes for the remote terminal.
///
/// Returns None for keys with no terminal encoding (e.g., function keys).
pub fn key_event_to_bytes(key: KeyEvent) -> Option<Vec<u8>> {
    match key.code {
        KeyCode::Char(ch) => {
            let bytes = if key.modifiers.contains(KeyModifiers::CONTROL) {
                let lowercase = ch.to_ascii_lowercase();
                if lowercase.is_ascii_lowercase() {
                    vec![(lowercase as u8 - b'a') + 1]
                } else {
                    encode_char(ch)
                }
            } else {
                encode_char(ch)
            };
            Some(with_alt_prefix(key.modifiers, bytes))
        }
        KeyCode::Enter => Some(with_alt_prefix(key.modifiers, vec![b'\r'])),
        KeyCode::Tab => Some(with_alt_prefix(key.modifiers, vec![b'\t'])),
        KeyCode::BackTab => Some(b"\x1b[Z".to_vec()),
        KeyCode::Backspace => Some(with_alt_prefix(key.modifiers, vec![0x7f])),
        KeyCode::Esc => Some(with_alt_prefix(key.modifiers, vec![0x1b])),
        KeyCode::Up => Some(encode_csi_key(key.modifiers, "A", "\x1b[A")),
        KeyCode::Down => Some(encode_csi_key(key.modifiers, "B", "\x1b[B")),
        KeyCode::Right => Some(encode_csi_key(key.modifiers, "C", "\x1b[C")),
        KeyCode::Left => Some(encode_csi_key(key.modifiers, "D", "\x1b[D")),
        KeyCode::Home => Some(encode_csi_key(key.modifiers, "H", "\x1b[H")),
        KeyCode::End => Some(encode_csi_key(key.modifiers, "F", "\x1b[F")),
        KeyCode::Delete => Some(encode_csi_tilde_key(key.modifiers, "3", "\x1b[3~")),
        KeyCode::PageUp => Some(encode_csi_tilde_key(key.modifiers, "5", "\x1b[5~")),
        KeyCode::PageDown => Some(encode_csi_tilde_key(key.modifiers, "6", "\x1b[6~")),
        _ => None,
    }
}

fn encode_char(ch: char) -> Vec<u8> {
    let mut buffer = [0u8; 4];
    ch.encode_utf8(&mut buffer).as_bytes().to_vec()
}

fn with_alt_prefix(modifiers: KeyModifiers, bytes: Vec<u8>) -> Vec<u8> {
    if !modifiers.contains(KeyModifiers::ALT) {
        return bytes;
    }
    let mut prefixed = Vec::with_capacity(bytes.len() + 1);
    prefixed.push(0x1b);
    prefixed.extend(bytes);
    prefixed
}

fn modifier_param(modifiers: KeyModifiers) -> Option<u8> {
    let mut value = 1;
    if modifiers.contains(KeyModifiers::SHIFT) {
        value += 1;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        value += 2;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        value += 4;
    }
    (value > 1).then_some(value)
}

fn encode_csi_key(modifiers: KeyModifiers, final_byte: &str, base: &str) -> Vec<u8> {
    if let Some(param) = modifier_param(modifiers) {
        return format!("\x1b[1;{param}{final_byte}").into_bytes();
    }
    base.as_bytes().to_vec()
}

fn encode_csi_tilde_key(modifiers: KeyModifiers, code: &str, base: &str) -> Vec<u8> {
    if let Some(param) = modifier_param(modifiers) {
        return format!("\x1b[{code};{param}~").into_bytes();
    }
    base.as_bytes().to_vec()
}

fn is_prefix(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('b') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Command bound to the key pressed after the prefix
fn command_for(key: &KeyEvent) -> Option<Command> {
    let KeyCode::Char(ch) = key.code else {
        return None;
    };
    match ch {
        'c' => Some(Command::NewSession),
        'n' => Some(Command::NextSession),
        'p' => Some(Command::PreviousSession),
        'w' => Some(Command::NewWindow),
        ']' => Some(Command::NextWindow),
        '[' => Some(Command::PreviousWindow),
        'i' => Some(Command::ContainerInfo),
        'l' => Some(Command::ListContainers),
        's' => Some(Command::ListSessions),
        'r' => Some(Command::Reconnect),
        'q' => Some(Command::Quit),
        _ => None,
    }
}

/// Turns terminal events into surface events, tracking the prefix key.
#[derive(Debug, Default)]
pub struct InputMapper {
    prefix_pending: bool,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, event: Event) -> Option<SurfaceEvent> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.map_key(key),
            Event::Resize(cols, rows) => Some(SurfaceEvent::Resize { cols, rows }),
            Event::Paste(text) => Some(SurfaceEvent::Input(text.into_bytes())),
            _ => None,
        }
    }

    fn map_key(&mut self, key: KeyEvent) -> Option<SurfaceEvent> {
        if self.prefix_pending {
            self.prefix_pending = false;
            if is_prefix(&key) {
                return Some(SurfaceEvent::Input(vec![PREFIX_BYTE]));
            }
            let command = command_for(&key);
            if command.is_none() {
                tracing::debug!(key = ?key.code, "Unbound key after prefix");
            }
            return command.map(SurfaceEvent::Command);
        }

        if is_prefix(&key) {
            self.prefix_pending = true;
            return None;
        }

        key_event_to_bytes(key).map(SurfaceEvent::Input)
    }
}
