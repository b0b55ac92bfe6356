use crate::activity::{ActivityTracker, Timestamp};
use crate::pattern::PatternMatcher;
use crate::settings::Settings;
use crate::tab::TabInfo;

/// URL prefixes of pages that are closed outright instead of archived.
pub const SKIP_ARCHIVE_PREFIXES: &[&str] =
    &["favorites://", "about:", "safari-resource:", "file://"];

pub fn should_skip_archive(url: &str) -> bool {
    url.is_empty()
        || SKIP_ARCHIVE_PREFIXES
            .iter()
            .any(|prefix| url.starts_with(prefix))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Archive,
    Delete,
}

/// What the archive routine did with a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Archived,
    SkippedDuplicate,
    Deleted,
}

/// Archive policy for one effective settings document.
pub struct ArchivePolicy<'a> {
    settings: &'a Settings,
    matcher: PatternMatcher,
}

impl<'a> ArchivePolicy<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            matcher: PatternMatcher::new(&settings.never_archive_patterns),
        }
    }

    /// Pinned tabs and tabs matching a never-archive pattern are never
    /// touched by the engine.
    pub fn is_protected(&self, tab: &TabInfo) -> bool {
        tab.pinned || self.matcher.matches(&tab.url)
    }

    pub fn evaluate(&self, tab: &TabInfo, tracker: &ActivityTracker, now: Timestamp) -> Verdict {
        if self.is_protected(tab) {
            return Verdict::Keep;
        }
        if should_skip_archive(&tab.url) {
            return Verdict::Delete;
        }
        let threshold_ms = i64::try_from(self.settings.threshold_ms()).unwrap_or(i64::MAX);
        let idle_ms = now.saturating_sub(tracker.last_active(&tab.url, now));
        if idle_ms >= threshold_ms {
            Verdict::Archive
        } else {
            Verdict::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ids::{TabId, WindowId};
    use crate::settings::TimeUnit;

    use super::*;

    const MINUTE_MS: i64 = 60 * 1000;

    fn ten_minute_settings() -> Settings {
        Settings {
            archive_threshold: 10,
            archive_threshold_unit: TimeUnit::Minutes,
            never_archive_patterns: vec!["*://github.com/*".to_owned()],
            ..Settings::default()
        }
    }

    fn tracker_with(url: &str, at: Timestamp) -> ActivityTracker {
        let mut tracker = ActivityTracker::default();
        tracker.record_activity(url, at);
        tracker
    }

    #[test]
    fn skip_archive_prefixes() {
        assert!(should_skip_archive(""));
        assert!(should_skip_archive("about:blank"));
        assert!(should_skip_archive("favorites://"));
        assert!(should_skip_archive("safari-resource:/start.html"));
        assert!(should_skip_archive("file:///Users/me/notes.html"));
        assert!(!should_skip_archive("https://example.com"));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let settings = ten_minute_settings();
        let policy = ArchivePolicy::new(&settings);
        let tab = TabInfo::new(TabId(1), WindowId(1), "https://a.example");
        let now = 100 * MINUTE_MS;

        let at_threshold = tracker_with(&tab.url, now - 10 * MINUTE_MS);
        let just_under = tracker_with(&tab.url, now - 10 * MINUTE_MS + 1);

        assert_eq!(policy.evaluate(&tab, &at_threshold, now), Verdict::Archive);
        assert_eq!(policy.evaluate(&tab, &just_under, now), Verdict::Keep);
    }

    #[test]
    fn pinned_and_pattern_protected_tabs_are_kept() {
        let settings = ten_minute_settings();
        let policy = ArchivePolicy::new(&settings);
        let now = 100 * MINUTE_MS;
        let pinned = TabInfo::new(TabId(1), WindowId(1), "https://a.example").pinned();
        let github = TabInfo::new(TabId(2), WindowId(1), "https://github.com/org/repo");
        let tracker = {
            let mut tracker = tracker_with(&pinned.url, 0);
            tracker.record_activity(&github.url, 0);
            tracker
        };

        assert_eq!(policy.evaluate(&pinned, &tracker, now), Verdict::Keep);
        assert_eq!(policy.evaluate(&github, &tracker, now), Verdict::Keep);
    }

    #[test]
    fn skip_archive_urls_are_deleted_regardless_of_age() {
        let settings = ten_minute_settings();
        let policy = ArchivePolicy::new(&settings);
        let tab = TabInfo::new(TabId(1), WindowId(1), "about:blank");

        assert_eq!(
            policy.evaluate(&tab, &ActivityTracker::default(), 0),
            Verdict::Delete
        );
    }

    #[test]
    fn never_seen_url_is_kept() {
        let settings = ten_minute_settings();
        let policy = ArchivePolicy::new(&settings);
        let tab = TabInfo::new(TabId(1), WindowId(1), "https://fresh.example");

        assert_eq!(
            policy.evaluate(&tab, &ActivityTracker::default(), 100 * MINUTE_MS),
            Verdict::Keep
        );
    }
}
