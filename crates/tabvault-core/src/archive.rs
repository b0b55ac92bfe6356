use serde::{Deserialize, Serialize};

use crate::activity::Timestamp;
use crate::ids::{ArchiveEntryId, WindowId};

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: ArchiveEntryId,
    pub title: String,
    pub url: String,
    pub timestamp: Timestamp,
    pub window_id: WindowId,
}

/// Archived tabs, newest first, at most one entry per URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStore {
    entries: Vec<ArchiveEntry>,
    last_id: u64,
}

impl ArchiveStore {
    pub fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        let mut store = Self::default();
        for entry in entries {
            if store.contains_url(&entry.url) {
                continue;
            }
            store.last_id = store.last_id.max(entry.id.0);
            store.entries.push(entry);
        }
        store
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.entries.iter().any(|entry| entry.url == url)
    }

    pub fn get(&self, id: ArchiveEntryId) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Prepends a new entry. A URL that is already archived is rejected and
    /// the existing entry is left untouched.
    pub fn insert(
        &mut self,
        title: &str,
        url: &str,
        window_id: WindowId,
        now: Timestamp,
    ) -> Option<ArchiveEntryId> {
        if self.contains_url(url) {
            return None;
        }
        let id = self.allocate_id(now);
        let title = if title.is_empty() { UNTITLED } else { title };
        self.entries.insert(
            0,
            ArchiveEntry {
                id,
                title: title.to_owned(),
                url: url.to_owned(),
                timestamp: now,
                window_id,
            },
        );
        Some(id)
    }

    pub fn remove(&mut self, id: ArchiveEntryId) -> Option<ArchiveEntry> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Drops every entry whose age reached `expiration_ms`. Returns the
    /// number of entries removed.
    pub fn purge_expired(&mut self, expiration_ms: u64, now: Timestamp) -> usize {
        let expiration_ms = i64::try_from(expiration_ms).unwrap_or(i64::MAX);
        let before = self.entries.len();
        self.entries
            .retain(|entry| now.saturating_sub(entry.timestamp) < expiration_ms);
        before - self.entries.len()
    }

    fn allocate_id(&mut self, now: Timestamp) -> ArchiveEntryId {
        let candidate = u64::try_from(now).unwrap_or(0);
        self.last_id = candidate.max(self.last_id + 1);
        ArchiveEntryId(self.last_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_entry_comes_first() {
        let mut store = ArchiveStore::default();
        store.insert("One", "https://one.example", WindowId(1), 10);
        store.insert("Two", "https://two.example", WindowId(1), 20);

        let urls: Vec<&str> = store.entries().iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://two.example", "https://one.example"]);
    }

    #[test]
    fn duplicate_url_is_rejected_not_merged() {
        let mut store = ArchiveStore::default();
        let first = store
            .insert("Old title", "https://a.example", WindowId(1), 10)
            .expect("first insert should succeed");

        assert!(store
            .insert("New title", "https://a.example", WindowId(2), 99)
            .is_none());
        assert_eq!(store.len(), 1);
        let entry = store.get(first).expect("entry should remain");
        assert_eq!(entry.title, "Old title");
        assert_eq!(entry.timestamp, 10);
    }

    #[test]
    fn ids_are_unique_even_within_one_millisecond() {
        let mut store = ArchiveStore::default();
        let a = store
            .insert("", "https://a.example", WindowId(1), 1_000)
            .expect("insert a");
        let b = store
            .insert("", "https://b.example", WindowId(1), 1_000)
            .expect("insert b");

        assert!(b > a);
        assert_eq!(store.get(a).expect("entry a").title, UNTITLED);
    }

    #[test]
    fn expiration_boundary() {
        let expiration_ms = 60_000u64;
        let now = 1_000_000i64;
        let mut store = ArchiveStore::default();
        store.insert("expired", "https://expired.example", WindowId(1), now - 60_001);
        store.insert("kept", "https://kept.example", WindowId(1), now - 59_999);

        assert_eq!(store.purge_expired(expiration_ms, now), 1);
        assert!(store.contains_url("https://kept.example"));
        assert!(!store.contains_url("https://expired.example"));
        assert_eq!(store.purge_expired(expiration_ms, now), 0);
    }

    #[test]
    fn entries_loaded_from_storage_stay_unique_and_ids_keep_growing() {
        let entry = |id: u64, url: &str| ArchiveEntry {
            id: ArchiveEntryId(id),
            title: "t".to_owned(),
            url: url.to_owned(),
            timestamp: 5,
            window_id: WindowId(1),
        };
        let mut store = ArchiveStore::from_entries(vec![
            entry(50, "https://a.example"),
            entry(40, "https://a.example"),
            entry(30, "https://b.example"),
        ]);

        assert_eq!(store.len(), 2);
        let id = store
            .insert("c", "https://c.example", WindowId(1), 1)
            .expect("insert should succeed");
        assert_eq!(id, ArchiveEntryId(51));
    }

    #[test]
    fn remove_and_clear() {
        let mut store = ArchiveStore::default();
        let id = store
            .insert("a", "https://a.example", WindowId(1), 1)
            .expect("insert");
        store.insert("b", "https://b.example", WindowId(1), 2);

        assert_eq!(store.remove(id).map(|e| e.url), Some("https://a.example".to_owned()));
        assert!(store.remove(id).is_none());
        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
    }
}
