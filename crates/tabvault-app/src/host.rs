use tabvault_core::{
    InMemoryTabProvider, MemoryProviderError, TabEvent, TabGroupInfo, TabId, TabInfo,
    TabProvider, WindowId, WindowInfo,
};

use crate::bridge::{Outbound, TabSnapshot};

/// Tab provider for a browser on the other end of the bridge.
///
/// Reads are answered from a mirror kept current by inbound events and
/// snapshots. Writes become outbound requests; removals also update the
/// mirror at once so a sweep sees its own effect.
#[derive(Debug, Default)]
pub struct BridgeTabProvider {
    mirror: InMemoryTabProvider,
    outbox: Vec<Outbound>,
}

impl BridgeTabProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, snapshot: TabSnapshot) {
        self.mirror.replace_all(
            snapshot.tabs,
            snapshot.windows,
            snapshot.groups,
            snapshot.groups_available,
            snapshot.current_window,
        );
    }

    /// Brings the mirror up to date before the engine sees `event`.
    pub fn apply_event(&mut self, event: &TabEvent) {
        match event {
            TabEvent::Activated { .. } => {}
            TabEvent::Updated { url, tab, .. } => {
                let mut tab = tab.clone();
                if let Some(url) = url {
                    tab.url = url.clone();
                }
                self.mirror.upsert_tab(tab);
            }
            TabEvent::Created { tab } => self.mirror.upsert_tab(tab.clone()),
            TabEvent::Removed { tab_id } => {
                self.mirror.forget_tab(*tab_id);
            }
        }
    }

    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    #[cfg(test)]
    pub fn mirror(&self) -> &InMemoryTabProvider {
        &self.mirror
    }
}

impl TabProvider for BridgeTabProvider {
    type Error = MemoryProviderError;

    fn tabs(&mut self, window_id: Option<WindowId>) -> Result<Vec<TabInfo>, Self::Error> {
        self.mirror.tabs(window_id)
    }

    fn tab(&mut self, tab_id: TabId) -> Result<TabInfo, Self::Error> {
        self.mirror.tab(tab_id)
    }

    fn windows(&mut self) -> Result<Vec<WindowInfo>, Self::Error> {
        self.mirror.windows()
    }

    fn current_window(&mut self) -> Result<WindowId, Self::Error> {
        self.mirror.current_window()
    }

    fn tab_groups_available(&self) -> bool {
        self.mirror.tab_groups_available()
    }

    fn tab_groups(&mut self) -> Result<Vec<TabGroupInfo>, Self::Error> {
        self.mirror.tab_groups()
    }

    fn create_tab(&mut self, url: &str) -> Result<Option<TabId>, Self::Error> {
        self.outbox.push(Outbound::CreateTab {
            url: url.to_owned(),
        });
        Ok(None)
    }

    fn remove_tab(&mut self, tab_id: TabId) -> Result<(), Self::Error> {
        self.mirror
            .forget_tab(tab_id)
            .ok_or(MemoryProviderError::TabNotFound(tab_id))?;
        self.outbox.push(Outbound::RemoveTab { tab_id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> TabSnapshot {
        TabSnapshot {
            tabs: vec![
                TabInfo::new(TabId(1), WindowId(1), "https://a.example"),
                TabInfo::new(TabId(2), WindowId(1), "https://b.example"),
            ],
            windows: vec![WindowInfo {
                id: WindowId(1),
                focused: true,
            }],
            ..TabSnapshot::default()
        }
    }

    #[test]
    fn removals_update_the_mirror_and_queue_a_request() {
        let mut provider = BridgeTabProvider::new();
        provider.apply_snapshot(snapshot());

        provider.remove_tab(TabId(1)).expect("remove should succeed");

        assert_eq!(provider.mirror().tab_count(), 1);
        assert_eq!(
            provider.take_outbox(),
            vec![Outbound::RemoveTab { tab_id: TabId(1) }]
        );
        assert!(provider.take_outbox().is_empty());
        assert_eq!(
            provider.remove_tab(TabId(1)),
            Err(MemoryProviderError::TabNotFound(TabId(1)))
        );
    }

    #[test]
    fn creations_wait_for_the_browser_to_assign_an_id() {
        let mut provider = BridgeTabProvider::new();
        provider.apply_snapshot(snapshot());

        assert_eq!(provider.create_tab("https://c.example"), Ok(None));
        assert_eq!(provider.mirror().tab_count(), 2);
        assert_eq!(
            provider.take_outbox(),
            vec![Outbound::CreateTab {
                url: "https://c.example".to_owned(),
            }]
        );
    }

    #[test]
    fn events_keep_the_mirror_current() {
        let mut provider = BridgeTabProvider::new();
        provider.apply_snapshot(snapshot());

        provider.apply_event(&TabEvent::Created {
            tab: TabInfo::new(TabId(3), WindowId(2), "https://c.example"),
        });
        provider.apply_event(&TabEvent::Updated {
            tab_id: TabId(2),
            url: Some("https://b.example/next".to_owned()),
            status_complete: false,
            tab: TabInfo::new(TabId(2), WindowId(1), "https://b.example"),
        });
        provider.apply_event(&TabEvent::Removed { tab_id: TabId(1) });

        assert!(provider.mirror().contains_tab(TabId(3)));
        assert!(!provider.mirror().contains_tab(TabId(1)));
        assert_eq!(
            provider.tab(TabId(2)).expect("tab 2 exists").url,
            "https://b.example/next"
        );
        assert_eq!(provider.windows().expect("windows").len(), 2);
    }
}
