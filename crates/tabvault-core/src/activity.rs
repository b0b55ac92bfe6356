use std::collections::{BTreeMap, BTreeSet};

use crate::ids::TabId;
use crate::policy::should_skip_archive;
use crate::tab::TabInfo;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// URLs with no open tab are dropped once their last activity is this old.
pub const STALE_ACTIVITY_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Last-activity bookkeeping.
///
/// `url_activity` is durable and keyed by URL so recency survives a restart.
/// `tab_index` only lives for one session and resolves closed tab ids back to
/// their URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityTracker {
    url_activity: BTreeMap<String, Timestamp>,
    tab_index: BTreeMap<TabId, String>,
}

impl ActivityTracker {
    pub fn with_url_activity(url_activity: BTreeMap<String, Timestamp>) -> Self {
        Self {
            url_activity,
            tab_index: BTreeMap::new(),
        }
    }

    pub fn url_activity(&self) -> &BTreeMap<String, Timestamp> {
        &self.url_activity
    }

    pub fn tab_index(&self) -> &BTreeMap<TabId, String> {
        &self.tab_index
    }

    /// Returns `true` when a timestamp was written.
    pub fn record_activity(&mut self, url: &str, now: Timestamp) -> bool {
        if url.is_empty() || should_skip_archive(url) {
            return false;
        }
        self.url_activity.insert(url.to_owned(), now);
        true
    }

    /// Records activity for `url` and points `tab_id` at it.
    pub fn observe(&mut self, tab_id: TabId, url: &str, now: Timestamp) -> bool {
        if !self.record_activity(url, now) {
            return false;
        }
        self.tab_index.insert(tab_id, url.to_owned());
        true
    }

    /// Unknown URLs count as active right now so that tabs which were never
    /// indexed are not immediately eligible for eviction.
    pub fn last_active(&self, url: &str, now: Timestamp) -> Timestamp {
        self.url_activity.get(url).copied().unwrap_or(now)
    }

    /// Rebuilds the tab index from the currently open tabs, seeds missing
    /// timestamps and drops URLs that have been closed for over 30 days.
    ///
    /// Returns the number of stale URLs removed.
    pub fn reindex_on_startup(&mut self, open_tabs: &[TabInfo], now: Timestamp) -> usize {
        self.tab_index.clear();
        for tab in open_tabs {
            if tab.url.is_empty() || should_skip_archive(&tab.url) {
                continue;
            }
            self.url_activity.entry(tab.url.clone()).or_insert(now);
            self.tab_index.insert(tab.id, tab.url.clone());
        }

        let open_urls: BTreeSet<&String> = self.tab_index.values().collect();
        let cutoff = now.saturating_sub(STALE_ACTIVITY_MS);
        let stale: Vec<String> = self
            .url_activity
            .iter()
            .filter(|(url, timestamp)| !open_urls.contains(url) && **timestamp < cutoff)
            .map(|(url, _)| url.clone())
            .collect();
        for url in &stale {
            self.url_activity.remove(url);
        }
        stale.len()
    }

    /// Drops the index entry only; the URL keeps its history in case it is
    /// reopened.
    pub fn remove_tab(&mut self, tab_id: TabId) -> Option<String> {
        self.tab_index.remove(&tab_id)
    }

    /// Removes both the index entry and the URL timestamp of an archived tab.
    pub fn forget(&mut self, tab_id: TabId, url: &str) {
        self.tab_index.remove(&tab_id);
        self.url_activity.remove(url);
    }
}

#[cfg(test)]
mod tests {
    use crate::ids::WindowId;

    use super::*;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[test]
    fn skip_archive_and_empty_urls_are_never_tracked() {
        let mut tracker = ActivityTracker::default();

        assert!(!tracker.record_activity("", 10));
        assert!(!tracker.record_activity("about:blank", 10));
        assert!(!tracker.observe(TabId(1), "file:///tmp/x.html", 10));
        assert!(tracker.url_activity().is_empty());
        assert!(tracker.tab_index().is_empty());
    }

    #[test]
    fn unknown_url_is_treated_as_fresh() {
        let mut tracker = ActivityTracker::default();
        tracker.record_activity("https://a.example", 100);

        assert_eq!(tracker.last_active("https://a.example", 500), 100);
        assert_eq!(tracker.last_active("https://never-seen.example", 500), 500);
    }

    #[test]
    fn reindex_preserves_existing_timestamps() {
        let mut tracker = ActivityTracker::with_url_activity(BTreeMap::from([(
            "https://old.example".to_owned(),
            1_000,
        )]));
        let tabs = vec![
            TabInfo::new(TabId(1), WindowId(1), "https://old.example"),
            TabInfo::new(TabId(2), WindowId(1), "https://new.example"),
            TabInfo::new(TabId(3), WindowId(1), "about:blank"),
        ];

        tracker.reindex_on_startup(&tabs, 50_000);

        assert_eq!(tracker.last_active("https://old.example", 50_000), 1_000);
        assert_eq!(tracker.url_activity().get("https://new.example"), Some(&50_000));
        assert_eq!(tracker.tab_index().len(), 2);
        assert!(!tracker.tab_index().contains_key(&TabId(3)));
    }

    #[test]
    fn reindex_sweeps_only_closed_urls_older_than_thirty_days() {
        let now = 100 * DAY_MS;
        let mut tracker = ActivityTracker::with_url_activity(BTreeMap::from([
            ("https://closed-old.example".to_owned(), now - 31 * DAY_MS),
            ("https://closed-recent.example".to_owned(), now - 29 * DAY_MS),
            ("https://open-old.example".to_owned(), now - 90 * DAY_MS),
        ]));
        let tabs = vec![TabInfo::new(
            TabId(1),
            WindowId(1),
            "https://open-old.example",
        )];

        let removed = tracker.reindex_on_startup(&tabs, now);

        assert_eq!(removed, 1);
        assert!(!tracker.url_activity().contains_key("https://closed-old.example"));
        assert!(tracker.url_activity().contains_key("https://closed-recent.example"));
        assert_eq!(
            tracker.last_active("https://open-old.example", now),
            now - 90 * DAY_MS
        );
    }

    #[test]
    fn closing_a_tab_keeps_url_history() {
        let mut tracker = ActivityTracker::default();
        tracker.observe(TabId(4), "https://a.example", 700);

        assert_eq!(tracker.remove_tab(TabId(4)), Some("https://a.example".to_owned()));
        assert_eq!(tracker.last_active("https://a.example", 900), 700);
        assert!(tracker.tab_index().is_empty());
    }

    #[test]
    fn forget_drops_both_maps() {
        let mut tracker = ActivityTracker::default();
        tracker.observe(TabId(4), "https://a.example", 700);

        tracker.forget(TabId(4), "https://a.example");

        assert!(tracker.tab_index().is_empty());
        assert!(tracker.url_activity().is_empty());
    }
}
