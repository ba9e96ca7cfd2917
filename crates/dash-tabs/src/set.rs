//! Tab sets
//!
//! A `TabSet` is an ordered list of tabs where at most one is active.
//! Cloning a set shares its state, so the UI and the driver can hold
//! the same set.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::TabError;
use crate::kind::{TabKind, TabOrigin};
use crate::tab::Tab;
use crate::Result;

/// Notifications emitted by a tab set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Selected {
        kind: TabKind,
        name: String,
        origin: TabOrigin,
        /// Session the window belongs to, for window tabs
        session: Option<String>,
    },
    Created {
        kind: TabKind,
        name: String,
        session: Option<String>,
    },
}

pub struct TabSet {
    kind: TabKind,
    tabs: Arc<RwLock<Vec<Tab>>>,
    /// Session the windows belong to (window sets only)
    current_session: Arc<RwLock<Option<String>>>,
    notifier: Option<UnboundedSender<TabEvent>>,
}

impl TabSet {
    pub fn new(kind: TabKind) -> Self {
        Self {
            kind,
            tabs: Arc::new(RwLock::new(Vec::new())),
            current_session: Arc::new(RwLock::new(None)),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: UnboundedSender<TabEvent>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn kind(&self) -> TabKind {
        self.kind
    }

    /// Make the named tab active. Returns false, leaving the current
    /// active tab untouched, if no tab has that name.
    pub fn select(&self, name: &str) -> bool {
        let name = name.trim();
        let origin = {
            let mut tabs = self.tabs.write();
            let Some(index) = tabs.iter().position(|t| t.name == name) else {
                tracing::debug!(kind = %self.kind, name = %name, "No tab to select");
                return false;
            };
            activate_only(&mut tabs, index);
            tabs[index].origin
        };

        tracing::info!(kind = %self.kind, name = %name, "Tab selected");

        self.notify(TabEvent::Selected {
            kind: self.kind,
            name: name.to_string(),
            origin,
            session: self.current_session(),
        });

        true
    }

    /// Add a user tab and make it active. Adding a name that already exists
    /// selects the existing tab instead.
    pub fn add(&self, name: &str) -> Result<Tab> {
        let tab = Tab::new(name, TabOrigin::User)?;

        if let Some(existing) = self.get(&tab.name) {
            self.select(&existing.name);
            return Ok(self.get(&existing.name).unwrap_or(existing));
        }

        let tab = {
            let mut tabs = self.tabs.write();
            tabs.push(tab);
            let index = tabs.len() - 1;
            activate_only(&mut tabs, index);
            tabs[index].clone()
        };

        tracing::info!(kind = %self.kind, name = %tab.name, "Tab created");

        self.notify(TabEvent::Created {
            kind: self.kind,
            name: tab.name.clone(),
            session: self.current_session(),
        });

        Ok(tab)
    }

    /// Add the next default-named tab, as the "+" button does.
    pub fn add_next(&self) -> Result<Tab> {
        let name = self.next_default_name();
        self.add(&name)
    }

    /// Merge a backend-reported list of names. Missing names are appended
    /// without notifications and the active tab is left alone. Returns the
    /// number of tabs added.
    pub fn sync<I, S>(&self, names: I, origin: TabOrigin) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tabs = self.tabs.write();
        let mut added = 0;

        for name in names {
            let Ok(tab) = Tab::new(name.as_ref(), origin) else {
                continue;
            };
            if tabs.iter().any(|t| t.name == tab.name) {
                continue;
            }
            tabs.push(tab);
            added += 1;
        }

        if added > 0 {
            tracing::debug!(kind = %self.kind, added, "Synced tabs from backend");
        }

        added
    }

    /// Mark a tab active without notifying, for a selection the backend
    /// already made. Returns false if no tab has that name.
    pub fn mark_active(&self, name: &str) -> bool {
        let mut tabs = self.tabs.write();
        let Some(index) = tabs.iter().position(|t| t.name == name.trim()) else {
            return false;
        };
        activate_only(&mut tabs, index);
        true
    }

    /// Remove a tab. If it was active, its neighbor becomes active.
    pub fn remove(&self, name: &str) -> Result<Tab> {
        let mut tabs = self.tabs.write();
        let index = tabs
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| TabError::NotFound(name.to_string()))?;

        let removed = tabs.remove(index);
        if removed.active && !tabs.is_empty() {
            let next = index.min(tabs.len() - 1);
            activate_only(&mut tabs, next);
        }

        tracing::info!(kind = %self.kind, name = %name, "Tab removed");

        Ok(removed)
    }

    /// Name of the active tab
    pub fn active(&self) -> Option<String> {
        self.tabs
            .read()
            .iter()
            .find(|t| t.active)
            .map(|t| t.name.clone())
    }

    pub fn get(&self, name: &str) -> Option<Tab> {
        self.tabs.read().iter().find(|t| t.name == name).cloned()
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.read().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.tabs.read().iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.read().is_empty()
    }

    /// Name of the tab the next `add_next` would create
    pub fn next_default_name(&self) -> String {
        let tabs = self.tabs.read();
        let mut count = tabs.len();
        loop {
            let name = self.kind.default_name(count);
            if !tabs.iter().any(|t| t.name == name) {
                return name;
            }
            count += 1;
        }
    }

    /// Name of the tab after the active one, wrapping around.
    pub fn next_name(&self) -> Option<String> {
        self.neighbor_name(1)
    }

    /// Name of the tab before the active one, wrapping around.
    pub fn previous_name(&self) -> Option<String> {
        self.neighbor_name(-1)
    }

    fn neighbor_name(&self, step: isize) -> Option<String> {
        let tabs = self.tabs.read();
        if tabs.is_empty() {
            return None;
        }
        let len = tabs.len() as isize;
        let current = tabs.iter().position(|t| t.active).unwrap_or(0) as isize;
        let index = (current + step).rem_euclid(len) as usize;
        Some(tabs[index].name.clone())
    }

    pub fn set_current_session(&self, session: Option<String>) {
        tracing::debug!(kind = %self.kind, session = ?session, "Current session set");
        *self.current_session.write() = session;
    }

    pub fn current_session(&self) -> Option<String> {
        self.current_session.read().clone()
    }

    fn notify(&self, event: TabEvent) {
        if let Some(notifier) = &self.notifier {
            if notifier.send(event).is_err() {
                tracing::debug!(kind = %self.kind, "Tab event receiver dropped");
            }
        }
    }
}

impl Clone for TabSet {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            tabs: Arc::clone(&self.tabs),
            current_session: Arc::clone(&self.current_session),
            notifier: self.notifier.clone(),
        }
    }
}

fn activate_only(tabs: &mut [Tab], index: usize) {
    for (i, tab) in tabs.iter_mut().enumerate() {
        if i == index {
            tab.activate();
        } else {
            tab.deactivate();
        }
    }
}

/// The session tab set and the window tab set, sharing one notifier.
#[derive(Clone)]
pub struct TabRegistry {
    pub sessions: TabSet,
    pub windows: TabSet,
}

impl TabRegistry {
    pub fn new(notifier: UnboundedSender<TabEvent>) -> Self {
        Self {
            sessions: TabSet::new(TabKind::Sessions).with_notifier(notifier.clone()),
            windows: TabSet::new(TabKind::Windows).with_notifier(notifier),
        }
    }

    pub fn set(&self, kind: TabKind) -> &TabSet {
        match kind {
            TabKind::Sessions => &self.sessions,
            TabKind::Windows => &self.windows,
        }
    }

    /// Point the window set at the session that just became active.
    pub fn follow_session(&self, session: &str) {
        self.windows.set_current_session(Some(session.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn active_count(set: &TabSet) -> usize {
        set.tabs().iter().filter(|t| t.active).count()
    }

    #[test]
    fn test_empty_set_has_no_active_tab() {
        let set = TabSet::new(TabKind::Sessions);
        assert_eq!(set.active(), None);
        assert!(!set.select("anything"));
        assert_eq!(active_count(&set), 0);
    }

    #[test]
    fn test_single_active_after_any_sequence() {
        let set = TabSet::new(TabKind::Windows);
        set.add("bash").unwrap();
        set.add("vim").unwrap();
        assert!(set.select("bash"));
        set.add_next().unwrap();
        assert!(!set.select("missing"));
        set.sync(["logs", "bash"], TabOrigin::Backend);
        assert!(set.select("logs"));

        assert_eq!(active_count(&set), 1);
        assert_eq!(set.active().as_deref(), Some("logs"));
    }

    #[test]
    fn test_select_missing_keeps_active() {
        let set = TabSet::new(TabKind::Sessions);
        set.add("Session 1").unwrap();
        set.add("Session 2").unwrap();
        assert!(set.select("Session 1"));

        assert!(!set.select("Session 9"));
        assert_eq!(set.active().as_deref(), Some("Session 1"));
    }

    #[test]
    fn test_add_existing_selects_instead_of_duplicating() {
        let set = TabSet::new(TabKind::Sessions);
        set.add("work").unwrap();
        set.add("play").unwrap();
        set.add("work").unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.active().as_deref(), Some("work"));
    }

    #[test]
    fn test_next_default_name_skips_taken_names() {
        let set = TabSet::new(TabKind::Sessions);
        set.add("Session 2").unwrap();
        assert_eq!(set.next_default_name(), "Session 3");

        let windows = TabSet::new(TabKind::Windows);
        windows.add_next().unwrap();
        windows.add_next().unwrap();
        assert_eq!(windows.names(), vec!["bash", "htop"]);
    }

    #[test]
    fn test_sync_leaves_activation_alone() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let set = TabSet::new(TabKind::Sessions).with_notifier(tx);
        let added = set.sync(["web-1", "db-1", "web-1"], TabOrigin::Container);
        assert_eq!(added, 2);
        assert_eq!(set.active(), None);
        assert_eq!(active_count(&set), 0);
        assert_eq!(set.get("db-1").unwrap().origin, TabOrigin::Container);

        assert!(set.mark_active("db-1"));
        assert!(!set.mark_active("missing"));
        set.sync(["cache-1"], TabOrigin::Container);
        assert_eq!(set.active().as_deref(), Some("db-1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_remove_active_moves_to_neighbor() {
        let set = TabSet::new(TabKind::Windows);
        set.add("bash").unwrap();
        set.add("htop").unwrap();
        set.add("vim").unwrap();
        set.select("htop");

        set.remove("htop").unwrap();
        assert_eq!(set.active().as_deref(), Some("vim"));
        assert!(matches!(set.remove("htop"), Err(TabError::NotFound(_))));
    }

    #[test]
    fn test_neighbors_wrap() {
        let set = TabSet::new(TabKind::Windows);
        set.add("bash").unwrap();
        set.add("htop").unwrap();
        assert_eq!(set.next_name().as_deref(), Some("bash"));
        assert_eq!(set.previous_name().as_deref(), Some("bash"));
        set.select("bash");
        assert_eq!(set.next_name().as_deref(), Some("htop"));
    }

    #[test]
    fn test_notifications() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = TabRegistry::new(tx);

        registry.sessions.add("work").unwrap();
        registry.follow_session("work");
        registry.windows.add("bash").unwrap();
        registry.windows.select("bash");
        registry.sessions.select("nope");

        assert_eq!(
            rx.try_recv().unwrap(),
            TabEvent::Created {
                kind: TabKind::Sessions,
                name: "work".to_string(),
                session: None,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            TabEvent::Created {
                kind: TabKind::Windows,
                name: "bash".to_string(),
                session: Some("work".to_string()),
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            TabEvent::Selected {
                kind: TabKind::Windows,
                name: "bash".to_string(),
                origin: TabOrigin::User,
                session: Some("work".to_string()),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clone_shares_state() {
        let set = TabSet::new(TabKind::Sessions);
        let other = set.clone();
        set.add("shared").unwrap();
        assert_eq!(other.active().as_deref(), Some("shared"));
    }
}
