//! Tab set kinds and tab origins

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    /// Backend sessions or containers
    Sessions,
    /// Windows inside the current session
    Windows,
}

impl TabKind {
    /// Name given to the tab created after `count` existing tabs.
    pub fn default_name(&self, count: usize) -> String {
        const WINDOW_NAMES: [&str; 7] = ["bash", "htop", "vim", "logs", "ssh", "tail", "top"];

        match self {
            TabKind::Sessions => format!("Session {}", count + 1),
            TabKind::Windows => WINDOW_NAMES
                .get(count)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("window-{}", count + 1)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabKind::Sessions => "sessions",
            TabKind::Windows => "windows",
        }
    }
}

impl std::fmt::Display for TabKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TabKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sessions" | "session" => Ok(TabKind::Sessions),
            "windows" | "window" => Ok(TabKind::Windows),
            _ => Err(format!("Unknown tab kind: {}", s)),
        }
    }
}

/// Where a tab came from. Selecting a backend-reported container switches
/// containers; selecting a user-created tab switches sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabOrigin {
    User,
    Container,
    Backend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_default_names() {
        assert_eq!(TabKind::Sessions.default_name(0), "Session 1");
        assert_eq!(TabKind::Sessions.default_name(4), "Session 5");
    }

    #[test]
    fn test_window_default_names() {
        assert_eq!(TabKind::Windows.default_name(0), "bash");
        assert_eq!(TabKind::Windows.default_name(6), "top");
        assert_eq!(TabKind::Windows.default_name(7), "window-8");
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Window".parse::<TabKind>(), Ok(TabKind::Windows));
        assert!("panes".parse::<TabKind>().is_err());
    }
}
