use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{GroupId, WindowId};

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    #[default]
    Global,
    PerWindow,
    PerTabGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    #[default]
    Hours,
    Days,
}

impl TimeUnit {
    pub fn parse(value: &str) -> Self {
        match value {
            "seconds" => Self::Seconds,
            "minutes" => Self::Minutes,
            "days" => Self::Days,
            _ => Self::Hours,
        }
    }

    pub fn to_millis(self, value: u64) -> u64 {
        let unit_ms = match self {
            Self::Seconds => SECOND_MS,
            Self::Minutes => MINUTE_MS,
            Self::Hours => HOUR_MS,
            Self::Days => DAY_MS,
        };
        value.saturating_mul(unit_ms)
    }
}

// Stored documents may carry units written by older builds; anything
// unrecognized reads back as hours.
impl<'de> Deserialize<'de> for TimeUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaxTabsAction {
    #[default]
    ArchiveOldest,
    CloseNew,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteLimit {
    pub domain: String,
    pub max_tabs: usize,
}

/// Partial settings stored per window or per tab group.
///
/// Every field left as `None` is inherited from the base document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_threshold: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_threshold_unit: Option<TimeUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_expiration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_expiration_unit: Option<TimeUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_tabs_for_archiving: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tabs_per_window: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tabs_action: Option<MaxTabsAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub never_archive_patterns: Option<Vec<String>>,
}

impl SettingsOverride {
    /// Overlays `other` onto `self`; fields set in `other` win.
    pub fn merge(&mut self, other: SettingsOverride) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.archive_threshold, other.archive_threshold);
        take(&mut self.archive_threshold_unit, other.archive_threshold_unit);
        take(&mut self.archive_expiration, other.archive_expiration);
        take(&mut self.archive_expiration_unit, other.archive_expiration_unit);
        take(&mut self.min_tabs_for_archiving, other.min_tabs_for_archiving);
        take(&mut self.max_tabs_per_window, other.max_tabs_per_window);
        take(&mut self.max_tabs_action, other.max_tabs_action);
        take(&mut self.never_archive_patterns, other.never_archive_patterns);
    }

    /// Produces the effective document: every overridden field replaces the
    /// base value, everything else is inherited.
    pub fn apply_to(&self, base: &Settings) -> Settings {
        let mut effective = base.clone();
        if let Some(value) = self.archive_threshold {
            effective.archive_threshold = value;
        }
        if let Some(unit) = self.archive_threshold_unit {
            effective.archive_threshold_unit = unit;
        }
        if let Some(value) = self.archive_expiration {
            effective.archive_expiration = value;
        }
        if let Some(unit) = self.archive_expiration_unit {
            effective.archive_expiration_unit = unit;
        }
        if let Some(value) = self.min_tabs_for_archiving {
            effective.min_tabs_for_archiving = value;
        }
        if let Some(value) = self.max_tabs_per_window {
            effective.max_tabs_per_window = value.max(1);
        }
        if let Some(action) = self.max_tabs_action {
            effective.max_tabs_action = action;
        }
        if let Some(patterns) = &self.never_archive_patterns {
            effective.never_archive_patterns = patterns.clone();
        }
        effective
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub scope: Scope,
    pub sync_enabled: bool,
    pub archive_threshold: u64,
    pub archive_threshold_unit: TimeUnit,
    pub archive_expiration: u64,
    pub archive_expiration_unit: TimeUnit,
    pub min_tabs_for_archiving: usize,
    pub max_tabs_per_window: usize,
    pub max_tabs_action: MaxTabsAction,
    pub never_archive_patterns: Vec<String>,
    pub site_limits: Vec<SiteLimit>,
    pub window_overrides: BTreeMap<WindowId, SettingsOverride>,
    pub tab_group_overrides: BTreeMap<GroupId, SettingsOverride>,
    pub tab_group_names: BTreeMap<GroupId, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scope: Scope::Global,
            sync_enabled: true,
            archive_threshold: 24,
            archive_threshold_unit: TimeUnit::Hours,
            archive_expiration: 24,
            archive_expiration_unit: TimeUnit::Hours,
            min_tabs_for_archiving: 11,
            max_tabs_per_window: 20,
            max_tabs_action: MaxTabsAction::ArchiveOldest,
            never_archive_patterns: Vec::new(),
            site_limits: Vec::new(),
            window_overrides: BTreeMap::new(),
            tab_group_overrides: BTreeMap::new(),
            tab_group_names: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn threshold_ms(&self) -> u64 {
        self.archive_threshold_unit.to_millis(self.archive_threshold)
    }

    pub fn expiration_ms(&self) -> u64 {
        self.archive_expiration_unit.to_millis(self.archive_expiration)
    }

    /// Restores the document invariants after it came from storage or from a
    /// caller: a cap of at least one tab, unique patterns, unique site-limit
    /// domains (the last entry for a domain wins).
    pub fn normalize(&mut self) {
        self.max_tabs_per_window = self.max_tabs_per_window.max(1);

        let mut seen = Vec::with_capacity(self.never_archive_patterns.len());
        self.never_archive_patterns.retain(|pattern| {
            if seen.contains(pattern) {
                return false;
            }
            seen.push(pattern.clone());
            true
        });

        let mut limits: Vec<SiteLimit> = Vec::with_capacity(self.site_limits.len());
        for limit in self.site_limits.drain(..) {
            limits.retain(|existing| existing.domain != limit.domain);
            limits.push(limit);
        }
        self.site_limits = limits;
    }

    /// Returns `true` when the pattern was not present yet.
    pub fn add_never_archive_pattern(&mut self, pattern: impl Into<String>) -> bool {
        let pattern = pattern.into();
        if self.never_archive_patterns.contains(&pattern) {
            return false;
        }
        self.never_archive_patterns.push(pattern);
        true
    }

    pub fn remove_never_archive_pattern(&mut self, pattern: &str) -> bool {
        let before = self.never_archive_patterns.len();
        self.never_archive_patterns.retain(|existing| existing != pattern);
        self.never_archive_patterns.len() != before
    }

    /// Inserts or replaces the limit for `domain`.
    pub fn set_site_limit(&mut self, domain: impl Into<String>, max_tabs: usize) {
        let domain = domain.into();
        self.site_limits.retain(|limit| limit.domain != domain);
        self.site_limits.push(SiteLimit { domain, max_tabs });
    }

    pub fn remove_site_limit(&mut self, domain: &str) -> bool {
        let before = self.site_limits.len();
        self.site_limits.retain(|limit| limit.domain != domain);
        self.site_limits.len() != before
    }

    pub fn set_window_override(&mut self, window_id: WindowId, overrides: SettingsOverride) {
        self.window_overrides
            .entry(window_id)
            .or_default()
            .merge(overrides);
    }

    pub fn remove_window_override(&mut self, window_id: WindowId) -> bool {
        self.window_overrides.remove(&window_id).is_some()
    }

    pub fn set_tab_group_override(&mut self, group_id: GroupId, overrides: SettingsOverride) {
        self.tab_group_overrides
            .entry(group_id)
            .or_default()
            .merge(overrides);
    }

    pub fn remove_tab_group_override(&mut self, group_id: GroupId) -> bool {
        self.tab_group_overrides.remove(&group_id).is_some()
    }

    /// The copy pushed to the sync area: override maps are device-local.
    pub fn synced_copy(&self) -> Settings {
        Settings {
            window_overrides: BTreeMap::new(),
            tab_group_overrides: BTreeMap::new(),
            ..self.clone()
        }
    }

    /// Replaces this document with one received from the sync area while
    /// keeping the local override maps.
    pub fn adopt_synced(&mut self, mut synced: Settings) {
        synced.window_overrides = std::mem::take(&mut self.window_overrides);
        synced.tab_group_overrides = std::mem::take(&mut self.tab_group_overrides);
        synced.normalize();
        *self = synced;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_value(json!({
            "scope": "perWindow",
            "archiveThreshold": 3,
            "archiveThresholdUnit": "minutes"
        }))
        .expect("partial document should deserialize");

        assert_eq!(settings.scope, Scope::PerWindow);
        assert_eq!(settings.threshold_ms(), 3 * 60 * 1000);
        assert_eq!(settings.min_tabs_for_archiving, 11);
        assert_eq!(settings.max_tabs_per_window, 20);
        assert_eq!(settings.max_tabs_action, MaxTabsAction::ArchiveOldest);
        assert!(settings.sync_enabled);
    }

    #[test]
    fn unknown_unit_reads_as_hours() {
        let settings: Settings = serde_json::from_value(json!({
            "archiveThreshold": 2,
            "archiveThresholdUnit": "fortnights"
        }))
        .expect("document should deserialize");

        assert_eq!(settings.archive_threshold_unit, TimeUnit::Hours);
        assert_eq!(settings.threshold_ms(), 2 * 60 * 60 * 1000);
    }

    #[test]
    fn days_unit_is_supported() {
        assert_eq!(TimeUnit::Days.to_millis(2), 2 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn override_maps_use_numeric_keys_on_the_wire() {
        let mut settings = Settings::default();
        settings.set_window_override(
            WindowId(5),
            SettingsOverride {
                max_tabs_per_window: Some(4),
                ..SettingsOverride::default()
            },
        );

        let value = serde_json::to_value(&settings).expect("settings should serialize");
        assert_eq!(value["windowOverrides"]["5"]["maxTabsPerWindow"], 4);

        let back: Settings = serde_json::from_value(value).expect("settings should deserialize");
        assert_eq!(back, settings);
    }

    #[test]
    fn override_apply_is_total_and_field_wise() {
        let base = Settings::default();
        let overrides = SettingsOverride {
            max_tabs_per_window: Some(8),
            archive_threshold_unit: Some(TimeUnit::Minutes),
            ..SettingsOverride::default()
        };

        let effective = overrides.apply_to(&base);

        assert_eq!(effective.max_tabs_per_window, 8);
        assert_eq!(effective.archive_threshold, base.archive_threshold);
        assert_eq!(effective.archive_threshold_unit, TimeUnit::Minutes);
        assert_eq!(effective.min_tabs_for_archiving, base.min_tabs_for_archiving);
        assert_eq!(SettingsOverride::default().apply_to(&base), base);
    }

    #[test]
    fn partial_override_updates_merge_into_existing_entry() {
        let mut settings = Settings::default();
        settings.set_tab_group_override(
            GroupId(3),
            SettingsOverride {
                max_tabs_per_window: Some(6),
                ..SettingsOverride::default()
            },
        );
        settings.set_tab_group_override(
            GroupId(3),
            SettingsOverride {
                min_tabs_for_archiving: Some(2),
                ..SettingsOverride::default()
            },
        );

        let stored = settings
            .tab_group_overrides
            .get(&GroupId(3))
            .expect("override should exist");
        assert_eq!(stored.max_tabs_per_window, Some(6));
        assert_eq!(stored.min_tabs_for_archiving, Some(2));

        assert!(settings.remove_tab_group_override(GroupId(3)));
        assert!(!settings.remove_tab_group_override(GroupId(3)));
    }

    #[test]
    fn patterns_are_unique_on_insert() {
        let mut settings = Settings::default();
        assert!(settings.add_never_archive_pattern("*://github.com/*"));
        assert!(!settings.add_never_archive_pattern("*://github.com/*"));
        assert_eq!(settings.never_archive_patterns.len(), 1);
        assert!(settings.remove_never_archive_pattern("*://github.com/*"));
        assert!(settings.never_archive_patterns.is_empty());
    }

    #[test]
    fn site_limits_are_unique_by_domain() {
        let mut settings = Settings::default();
        settings.set_site_limit("youtube.com", 3);
        settings.set_site_limit("reddit.com", 2);
        settings.set_site_limit("youtube.com", 5);

        assert_eq!(
            settings.site_limits,
            vec![
                SiteLimit {
                    domain: "reddit.com".to_owned(),
                    max_tabs: 2,
                },
                SiteLimit {
                    domain: "youtube.com".to_owned(),
                    max_tabs: 5,
                },
            ]
        );
        assert!(settings.remove_site_limit("reddit.com"));
        assert_eq!(settings.site_limits.len(), 1);
    }

    #[test]
    fn normalize_restores_invariants() {
        let mut settings = Settings {
            max_tabs_per_window: 0,
            never_archive_patterns: vec!["a".to_owned(), "b".to_owned(), "a".to_owned()],
            site_limits: vec![
                SiteLimit {
                    domain: "x.com".to_owned(),
                    max_tabs: 1,
                },
                SiteLimit {
                    domain: "x.com".to_owned(),
                    max_tabs: 4,
                },
            ],
            ..Settings::default()
        };

        settings.normalize();

        assert_eq!(settings.max_tabs_per_window, 1);
        assert_eq!(settings.never_archive_patterns, vec!["a", "b"]);
        assert_eq!(settings.site_limits.len(), 1);
        assert_eq!(settings.site_limits[0].max_tabs, 4);
    }

    #[test]
    fn synced_copy_strips_local_overrides_and_adopt_keeps_them() {
        let mut local = Settings {
            scope: Scope::PerWindow,
            ..Settings::default()
        };
        local.set_window_override(
            WindowId(1),
            SettingsOverride {
                max_tabs_per_window: Some(3),
                ..SettingsOverride::default()
            },
        );

        let synced = local.synced_copy();
        assert!(synced.window_overrides.is_empty());
        assert!(synced.tab_group_overrides.is_empty());

        let remote = Settings {
            archive_threshold: 2,
            ..synced
        };
        local.adopt_synced(remote);

        assert_eq!(local.archive_threshold, 2);
        assert!(local.window_overrides.contains_key(&WindowId(1)));
    }
}
