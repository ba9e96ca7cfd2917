//! Session data structure
//!
//! A session is created by the backend. The client never mutates it and
//! only keeps the id around for reattaching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque backend identifier
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// When the backend created the session
    #[serde(rename = "created", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Container the session runs in, if the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: None,
            container: None,
        }
    }

    /// Name to show, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_session() {
        let session: Session = serde_json::from_str(
            r#"{"id":"work-1700000000","name":"work","created":"2024-01-02T03:04:05.123456789Z","active":true,"container":"host"}"#,
        )
        .unwrap();

        assert_eq!(session.id, "work-1700000000");
        assert_eq!(session.name, "work");
        assert!(session.created_at.is_some());
        assert_eq!(session.container.as_deref(), Some("host"));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let session = Session::new("abc", "");
        assert_eq!(session.display_name(), "abc");
    }
}
