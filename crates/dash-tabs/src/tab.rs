//! Tab data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TabError;
use crate::kind::TabOrigin;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    /// Unique identifier
    pub id: String,
    /// Display name, also the key used for selection
    pub name: String,
    /// Whether this is the active tab of its set
    pub active: bool,
    pub origin: TabOrigin,
    pub created_at: DateTime<Utc>,
    /// Last time the tab became active
    pub last_selected_at: Option<DateTime<Utc>>,
}

impl Tab {
    pub fn new(name: impl Into<String>, origin: TabOrigin) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(TabError::EmptyName);
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            active: false,
            origin,
            created_at: Utc::now(),
            last_selected_at: None,
        })
    }

    pub fn activate(&mut self) {
        if !self.active {
            tracing::trace!(tab_id = %self.id, name = %self.name, "Tab activated");
        }
        self.active = true;
        self.last_selected_at = Some(Utc::now());
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tab_is_inactive() {
        let tab = Tab::new("  web-1 ", TabOrigin::Container).unwrap();
        assert_eq!(tab.name, "web-1");
        assert!(!tab.active);
        assert!(tab.last_selected_at.is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            Tab::new("   ", TabOrigin::User),
            Err(TabError::EmptyName)
        ));
    }

    #[test]
    fn test_activate_records_time() {
        let mut tab = Tab::new("bash", TabOrigin::User).unwrap();
        tab.activate();
        assert!(tab.active);
        assert!(tab.last_selected_at.is_some());
        tab.deactivate();
        assert!(!tab.active);
    }
}
