use std::collections::BTreeMap;

use thiserror::Error;

use crate::ids::{GroupId, TabId, WindowId};
use crate::tab::{TabGroupInfo, TabInfo, WindowInfo};

/// Access to the browser's live tabs and windows.
///
/// Every call is best-effort: the engine logs failures and carries on.
pub trait TabProvider {
    type Error: std::fmt::Display;

    fn tabs(&mut self, window_id: Option<WindowId>) -> Result<Vec<TabInfo>, Self::Error>;

    fn tab(&mut self, tab_id: TabId) -> Result<TabInfo, Self::Error>;

    fn windows(&mut self) -> Result<Vec<WindowInfo>, Self::Error>;

    fn current_window(&mut self) -> Result<WindowId, Self::Error>;

    fn tab_groups_available(&self) -> bool;

    fn tab_groups(&mut self) -> Result<Vec<TabGroupInfo>, Self::Error>;

    /// Opens `url` in the current window. Returns `None` when the browser
    /// assigns the id later and reports it through a created event.
    fn create_tab(&mut self, url: &str) -> Result<Option<TabId>, Self::Error>;

    fn remove_tab(&mut self, tab_id: TabId) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    TabCreated { tab_id: TabId, url: String },
    TabRemoved { tab_id: TabId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryProviderError {
    #[error("no tab with id {0}")]
    TabNotFound(TabId),
    #[error("no window is open")]
    NoWindow,
    #[error("tab groups are not supported")]
    GroupsUnavailable,
}

/// Tab provider backed by plain maps.
///
/// Serves as the mirror of the real browser in the host app and as the
/// provider in tests; every create and remove is recorded in `events`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTabProvider {
    tabs: BTreeMap<TabId, TabInfo>,
    windows: BTreeMap<WindowId, WindowInfo>,
    groups: BTreeMap<GroupId, TabGroupInfo>,
    groups_available: bool,
    current_window: Option<WindowId>,
    next_tab_id: u64,
    events: Vec<ProviderEvent>,
}

impl InMemoryTabProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tab_groups(mut self) -> Self {
        self.groups_available = true;
        self
    }

    pub fn events(&self) -> &[ProviderEvent] {
        &self.events
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn contains_tab(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn add_window(&mut self, window_id: WindowId, focused: bool) {
        if focused {
            for window in self.windows.values_mut() {
                window.focused = false;
            }
            self.current_window = Some(window_id);
        }
        self.windows.insert(
            window_id,
            WindowInfo {
                id: window_id,
                focused,
            },
        );
        if self.current_window.is_none() {
            self.current_window = Some(window_id);
        }
    }

    pub fn add_group(&mut self, group: TabGroupInfo) {
        self.groups.insert(group.id, group);
    }

    /// Inserts or replaces a tab as reported by the browser. Its window is
    /// registered on first sight.
    pub fn upsert_tab(&mut self, tab: TabInfo) {
        if !self.windows.contains_key(&tab.window_id) {
            self.add_window(tab.window_id, false);
        }
        self.next_tab_id = self.next_tab_id.max(tab.id.0);
        self.tabs.insert(tab.id, tab);
    }

    /// Forgets a tab the browser already closed. Not recorded as an event.
    pub fn forget_tab(&mut self, tab_id: TabId) -> Option<TabInfo> {
        self.tabs.remove(&tab_id)
    }

    /// Replaces the whole mirror with a fresh enumeration.
    pub fn replace_all(
        &mut self,
        tabs: Vec<TabInfo>,
        windows: Vec<WindowInfo>,
        groups: Vec<TabGroupInfo>,
        groups_available: bool,
        current_window: Option<WindowId>,
    ) {
        self.tabs.clear();
        self.windows.clear();
        self.groups.clear();
        self.current_window = None;
        self.groups_available = groups_available;
        for window in windows {
            self.add_window(window.id, window.focused);
        }
        for group in groups {
            self.add_group(group);
        }
        for tab in tabs {
            self.upsert_tab(tab);
        }
        if current_window.is_some() {
            self.current_window = current_window;
        }
    }
}

impl TabProvider for InMemoryTabProvider {
    type Error = MemoryProviderError;

    fn tabs(&mut self, window_id: Option<WindowId>) -> Result<Vec<TabInfo>, Self::Error> {
        Ok(self
            .tabs
            .values()
            .filter(|tab| window_id.map_or(true, |id| tab.window_id == id))
            .cloned()
            .collect())
    }

    fn tab(&mut self, tab_id: TabId) -> Result<TabInfo, Self::Error> {
        self.tabs
            .get(&tab_id)
            .cloned()
            .ok_or(MemoryProviderError::TabNotFound(tab_id))
    }

    fn windows(&mut self) -> Result<Vec<WindowInfo>, Self::Error> {
        Ok(self.windows.values().cloned().collect())
    }

    fn current_window(&mut self) -> Result<WindowId, Self::Error> {
        self.current_window
            .filter(|id| self.windows.contains_key(id))
            .ok_or(MemoryProviderError::NoWindow)
    }

    fn tab_groups_available(&self) -> bool {
        self.groups_available
    }

    fn tab_groups(&mut self) -> Result<Vec<TabGroupInfo>, Self::Error> {
        if !self.groups_available {
            return Err(MemoryProviderError::GroupsUnavailable);
        }
        Ok(self.groups.values().cloned().collect())
    }

    fn create_tab(&mut self, url: &str) -> Result<Option<TabId>, Self::Error> {
        let window_id = self.current_window()?;
        self.next_tab_id += 1;
        let tab_id = TabId(self.next_tab_id);
        self.tabs.insert(tab_id, TabInfo::new(tab_id, window_id, url));
        self.events.push(ProviderEvent::TabCreated {
            tab_id,
            url: url.to_owned(),
        });
        Ok(Some(tab_id))
    }

    fn remove_tab(&mut self, tab_id: TabId) -> Result<(), Self::Error> {
        self.tabs
            .remove(&tab_id)
            .ok_or(MemoryProviderError::TabNotFound(tab_id))?;
        self.events.push(ProviderEvent::TabRemoved { tab_id });
        Ok(())
    }
}
