use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::activity::{ActivityTracker, Timestamp};
use crate::archive::{ArchiveEntry, ArchiveStore};
use crate::capacity::{decide, oldest_candidates, site_limit_violation, CapacityDecision};
use crate::command::{Command, Response, Stats, TabGroupSummary, WindowSummary};
use crate::error::TabvaultError;
use crate::event::TabEvent;
use crate::ids::{ArchiveEntryId, GroupId, TabId, WindowId};
use crate::persistence::{Persistence, StorageArea, StorageKey};
use crate::policy::{should_skip_archive, ArchiveOutcome, ArchivePolicy, Verdict};
use crate::provider::TabProvider;
use crate::resolver::{resolve_for_group, resolve_for_window};
use crate::scheduler::SweepReport;
use crate::settings::{Scope, Settings};
use crate::tab::{unpinned_count, TabInfo};

/// Owns every piece of lifecycle state and the collaborators it talks to.
///
/// All mutations go through `&mut self`, so a single owner serializes them.
/// Failures from storage or the provider are logged and never returned.
pub struct Engine<P: Persistence, T: TabProvider> {
    settings: Settings,
    archive: ArchiveStore,
    activity: ActivityTracker,
    window_names: BTreeMap<WindowId, String>,
    settings_revision: u64,
    persistence: P,
    provider: T,
}

impl<P: Persistence, T: TabProvider> Engine<P, T> {
    pub fn new(persistence: P, provider: T) -> Self {
        Self::with_settings(persistence, provider, Settings::default())
    }

    pub fn with_settings(persistence: P, provider: T, mut settings: Settings) -> Self {
        settings.normalize();
        Self {
            settings,
            archive: ArchiveStore::default(),
            activity: ActivityTracker::default(),
            window_names: BTreeMap::new(),
            settings_revision: 0,
            persistence,
            provider,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn archive(&self) -> &ArchiveStore {
        &self.archive
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn window_names(&self) -> &BTreeMap<WindowId, String> {
        &self.window_names
    }

    /// Increases on every settings mutation, local or synced.
    pub fn settings_revision(&self) -> u64 {
        self.settings_revision
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn provider(&self) -> &T {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut T {
        &mut self.provider
    }

    /// Loads every stored document and indexes the open tabs.
    pub fn bootstrap(&mut self, now: Timestamp) {
        self.load_stored();
        self.reindex(now);
    }

    /// Loads settings, archive, URL activity and window names.
    ///
    /// Synced settings win over local ones; local override maps survive.
    pub fn load_stored(&mut self) {
        let synced = match load::<_, Settings>(
            &mut self.persistence,
            StorageArea::Sync,
            StorageKey::Settings,
        ) {
            Ok(synced) => synced,
            Err(err) => {
                debug!("{err}; using local settings");
                None
            }
        };
        let local = load_or_warn::<_, Settings>(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::Settings,
        );

        let mut settings = local.unwrap_or_default();
        match synced {
            Some(synced) => {
                info!("loaded synced settings");
                settings.adopt_synced(synced);
            }
            None => settings.normalize(),
        }
        self.settings = settings;
        self.settings_revision += 1;
        store(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::Settings,
            &self.settings,
        );

        let entries = load_or_warn::<_, Vec<ArchiveEntry>>(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::Archive,
        )
        .unwrap_or_default();
        self.archive = ArchiveStore::from_entries(entries);

        let url_activity = load_or_warn::<_, BTreeMap<String, Timestamp>>(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::UrlActivity,
        )
        .unwrap_or_default();
        self.activity = ActivityTracker::with_url_activity(url_activity);

        self.window_names = load_or_warn(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::WindowNames,
        )
        .unwrap_or_default();

        info!(
            "loaded {} archive entries and {} url timestamps",
            self.archive.len(),
            self.activity.url_activity().len()
        );
    }

    /// Rebuilds the tab index from the provider's current tabs.
    pub fn reindex(&mut self, now: Timestamp) {
        let tabs = self.open_tabs(None);
        let removed = self.activity.reindex_on_startup(&tabs, now);
        if removed > 0 {
            debug!("dropped {removed} stale url timestamps");
        }
        self.persist_activity();
        info!(
            "tracking {} open tabs ({} urls with timestamps)",
            tabs.len(),
            self.activity.url_activity().len()
        );
    }

    pub fn handle_event(&mut self, event: TabEvent, now: Timestamp) {
        match event {
            TabEvent::Activated { tab_id } => match self.provider.tab(tab_id) {
                Ok(tab) => self.observe(tab_id, &tab.url, now),
                Err(err) => warn!("{}", TabvaultError::provider("tab", err)),
            },
            TabEvent::Updated {
                tab_id,
                url,
                status_complete,
                mut tab,
            } => {
                if status_complete {
                    self.observe(tab_id, &tab.url, now);
                }
                if let Some(url) = url {
                    self.observe(tab_id, &url, now);
                    tab.url = url;
                    self.enforce_site_limits(&tab);
                }
            }
            TabEvent::Created { tab } => {
                self.observe(tab.id, &tab.url, now);
                if !self.enforce_site_limits(&tab) {
                    self.enforce_max_tabs(tab.window_id, Some(&tab), now);
                }
            }
            TabEvent::Removed { tab_id } => {
                if self.activity.remove_tab(tab_id).is_some() {
                    self.persist_activity();
                }
            }
        }
    }

    pub fn handle_command(&mut self, command: Command, now: Timestamp) -> Response {
        debug!("handling {}", command.name());
        match command {
            Command::GetSettings => Response::Settings(self.settings.clone()),
            Command::UpdateSettings { settings } => {
                self.settings = settings;
                self.save_settings();
                Response::ack(true)
            }
            Command::GetWindows => Response::Windows(self.window_summaries()),
            Command::SetWindowName { window_id, name } => {
                self.window_names.insert(window_id, name);
                let saved = store(
                    &mut self.persistence,
                    StorageArea::Local,
                    StorageKey::WindowNames,
                    &self.window_names,
                );
                Response::ack(saved)
            }
            Command::SetWindowOverride {
                window_id,
                overrides,
            } => {
                self.settings.set_window_override(window_id, overrides);
                self.save_settings();
                Response::ack(true)
            }
            Command::RemoveWindowOverride { window_id } => {
                self.settings.remove_window_override(window_id);
                self.save_settings();
                Response::ack(true)
            }
            Command::GetCurrentWindow => {
                let window_id = match self.provider.current_window() {
                    Ok(window_id) => Some(window_id),
                    Err(err) => {
                        warn!("{}", TabvaultError::provider("current_window", err));
                        None
                    }
                };
                Response::CurrentWindow { window_id }
            }
            Command::GetTabGroups => self.tab_group_summaries(),
            Command::SetTabGroupOverride {
                group_id,
                overrides,
            } => {
                self.settings.set_tab_group_override(group_id, overrides);
                self.save_settings();
                Response::ack(true)
            }
            Command::RemoveTabGroupOverride { group_id } => {
                self.settings.remove_tab_group_override(group_id);
                self.save_settings();
                Response::ack(true)
            }
            Command::IsTabGroupsAvailable => Response::Availability {
                available: self.provider.tab_groups_available(),
            },
            Command::GetArchive => Response::Archive(self.archive.entries().to_vec()),
            Command::RestoreTab { id, url } => Response::ack(self.restore_tab(id, &url, now)),
            Command::DeleteFromArchive { id } => {
                if self.archive.remove(id).is_some() {
                    self.persist_archive();
                }
                Response::ack(true)
            }
            Command::ClearArchive => {
                let removed = self.archive.clear();
                info!("cleared {removed} archive entries");
                self.persist_archive();
                Response::ack(true)
            }
            Command::AddNeverArchivePattern { pattern } => {
                if self.settings.add_never_archive_pattern(pattern) {
                    self.save_settings();
                }
                Response::ack(true)
            }
            Command::RemoveNeverArchivePattern { pattern } => {
                if self.settings.remove_never_archive_pattern(&pattern) {
                    self.save_settings();
                }
                Response::ack(true)
            }
            Command::AddSiteLimit { domain, max_tabs } => {
                self.settings.set_site_limit(domain, max_tabs);
                self.save_settings();
                Response::ack(true)
            }
            Command::RemoveSiteLimit { domain } => {
                if self.settings.remove_site_limit(&domain) {
                    self.save_settings();
                }
                Response::ack(true)
            }
            Command::GetStats => Response::Stats(self.stats()),
            Command::NeverArchiveTab { url } => Response::ack(self.never_archive_origin(&url)),
        }
    }

    /// Replaces the settings with a document pushed from another device.
    pub fn apply_synced_settings(&mut self, synced: Settings) {
        info!("settings updated from another device");
        self.settings.adopt_synced(synced);
        self.settings_revision += 1;
        store(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::Settings,
            &self.settings,
        );
    }

    /// One periodic cleanup: expired entries first, then the threshold sweep
    /// of every open window.
    pub fn tick(&mut self, now: Timestamp) -> SweepReport {
        let purged = self.purge_expired(now);
        let windows = match self.provider.windows() {
            Ok(windows) => windows,
            Err(err) => {
                warn!("{}", TabvaultError::provider("windows", err));
                Vec::new()
            }
        };
        let archived = windows
            .iter()
            .map(|window| self.archive_inactive_tabs(window.id, now))
            .sum();
        let report = SweepReport { purged, archived };
        if !report.is_empty() {
            info!("cleanup purged {purged} entries and archived {archived} tabs");
        }
        report
    }

    /// Removes archive entries older than the base expiration.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let purged = self
            .archive
            .purge_expired(self.settings.expiration_ms(), now);
        if purged > 0 {
            info!("purged {purged} expired archive entries");
            self.persist_archive();
        }
        purged
    }

    /// Threshold sweep of one window. Returns the number of tabs closed.
    pub fn archive_inactive_tabs(&mut self, window_id: WindowId, now: Timestamp) -> usize {
        let tabs = self.open_tabs(Some(window_id));
        let archived: usize = if self.per_group_scope() {
            let mut by_group: BTreeMap<GroupId, Vec<TabInfo>> = BTreeMap::new();
            for tab in tabs {
                let group_id = tab.real_group().unwrap_or(GroupId::NONE);
                by_group.entry(group_id).or_default().push(tab);
            }
            by_group
                .into_iter()
                .map(|(group_id, group_tabs)| {
                    let effective = resolve_for_group(&self.settings, Some(group_id)).into_owned();
                    self.sweep_scope(&group_tabs, &effective, now)
                })
                .sum()
        } else {
            let effective = resolve_for_window(&self.settings, Some(window_id)).into_owned();
            self.sweep_scope(&tabs, &effective, now)
        };
        if archived > 0 {
            info!("archived {archived} inactive tabs in {window_id}");
        }
        archived
    }

    /// Closes `tab`, keeping a record of it unless it is a skip-archive page
    /// or its URL is already archived.
    pub fn archive_tab(&mut self, tab: &TabInfo, now: Timestamp) -> ArchiveOutcome {
        self.activity.forget(tab.id, &tab.url);
        self.persist_activity();

        if should_skip_archive(&tab.url) {
            self.close_tab(tab.id);
            debug!("deleted {} without archiving", tab.id);
            return ArchiveOutcome::Deleted;
        }

        let outcome = match self.archive.insert(&tab.title, &tab.url, tab.window_id, now) {
            Some(id) => {
                self.persist_archive();
                info!("archived {} as {id}", tab.url);
                ArchiveOutcome::Archived
            }
            None => {
                debug!("skipped duplicate archive entry for {}", tab.url);
                ArchiveOutcome::SkippedDuplicate
            }
        };
        self.close_tab(tab.id);
        outcome
    }

    /// Closes `tab` when it pushes its site over a configured limit.
    /// Returns `true` when the tab was closed.
    pub fn enforce_site_limits(&mut self, tab: &TabInfo) -> bool {
        if tab.pinned || tab.url.is_empty() || self.settings.site_limits.is_empty() {
            return false;
        }
        let window_tabs = self.open_tabs(Some(tab.window_id));
        let Some(limit) = site_limit_violation(&self.settings.site_limits, tab, &window_tabs) else {
            return false;
        };
        info!(
            "site limit of {} tabs reached for {}; closing {}",
            limit.max_tabs, limit.domain, tab.id
        );
        self.close_new_tab(tab.id);
        true
    }

    /// Applies the tab cap to the scope `new_tab` landed in. Returns the
    /// number of tabs closed.
    pub fn enforce_max_tabs(
        &mut self,
        window_id: WindowId,
        new_tab: Option<&TabInfo>,
        now: Timestamp,
    ) -> usize {
        let group_id = new_tab
            .and_then(TabInfo::real_group)
            .filter(|_| self.per_group_scope());
        let effective = match group_id {
            Some(group_id) => resolve_for_group(&self.settings, Some(group_id)).into_owned(),
            None => resolve_for_window(&self.settings, Some(window_id)).into_owned(),
        };
        let scope_tabs = self.scope_tabs(window_id, group_id);

        match decide(
            &scope_tabs,
            effective.min_tabs_for_archiving,
            effective.max_tabs_per_window,
            effective.max_tabs_action,
            new_tab,
        ) {
            CapacityDecision::BelowMinimum | CapacityDecision::WithinLimit => 0,
            CapacityDecision::CloseNew => match new_tab {
                Some(tab) => {
                    info!(
                        "{window_id} is over {} tabs; closing new {}",
                        effective.max_tabs_per_window, tab.id
                    );
                    self.close_new_tab(tab.id);
                    1
                }
                None => 0,
            },
            CapacityDecision::ArchiveOldest { excess } => {
                debug!("{window_id} is {excess} tabs over its cap");
                let swept = match group_id {
                    Some(_) => self.sweep_scope(&scope_tabs, &effective, now),
                    None => self.archive_inactive_tabs(window_id, now),
                };

                let remaining = self.scope_tabs(window_id, group_id);
                let excess =
                    unpinned_count(&remaining).saturating_sub(effective.max_tabs_per_window);
                if excess == 0 {
                    return swept;
                }
                let candidates = {
                    let policy = ArchivePolicy::new(&effective);
                    oldest_candidates(&remaining, &policy, &self.activity, excess, now)
                };
                for tab in &candidates {
                    self.archive_tab(tab, now);
                }
                swept + candidates.len()
            }
        }
    }

    /// Writes settings locally and, when enabled, a copy without the
    /// device-local override maps to the sync area.
    pub fn save_settings(&mut self) {
        self.settings.normalize();
        self.settings_revision += 1;
        store(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::Settings,
            &self.settings,
        );
        if !self.settings.sync_enabled {
            return;
        }
        let synced = match serde_json::to_value(self.settings.synced_copy()) {
            Ok(value) => value,
            Err(err) => {
                warn!("could not encode synced settings: {err}");
                return;
            }
        };
        match self
            .persistence
            .save(StorageArea::Sync, StorageKey::Settings, &synced)
        {
            Ok(()) => debug!("settings synced"),
            Err(err) => warn!("{}", TabvaultError::SyncUnavailable(err.to_string())),
        }
    }

    fn restore_tab(&mut self, id: ArchiveEntryId, url: &str, now: Timestamp) -> bool {
        match self.provider.create_tab(url) {
            Ok(Some(tab_id)) => info!("restored {url} into {tab_id}"),
            Ok(None) => info!("restored {url}"),
            Err(err) => {
                warn!("{}", TabvaultError::provider("create_tab", err));
                return false;
            }
        }
        // The created event indexes the new tab; only the URL is refreshed here.
        if self.activity.record_activity(url, now) {
            self.persist_activity();
        }
        if self.archive.remove(id).is_some() {
            self.persist_archive();
        }
        true
    }

    fn never_archive_origin(&mut self, url: &str) -> bool {
        let origin = match Url::parse(url) {
            Ok(parsed) => parsed.origin(),
            Err(err) => {
                warn!("cannot protect `{url}`: {err}");
                return false;
            }
        };
        if !origin.is_tuple() {
            warn!("cannot protect `{url}`: it has no origin");
            return false;
        }
        let pattern = format!("{}/*", origin.ascii_serialization());
        if self.settings.add_never_archive_pattern(pattern.clone()) {
            info!("added never-archive pattern {pattern}");
            self.save_settings();
        }
        true
    }

    fn window_summaries(&mut self) -> Vec<WindowSummary> {
        let windows = match self.provider.windows() {
            Ok(windows) => windows,
            Err(err) => {
                warn!("{}", TabvaultError::provider("windows", err));
                return Vec::new();
            }
        };
        let tabs = self.open_tabs(None);
        windows
            .into_iter()
            .map(|window| WindowSummary {
                id: window.id,
                tab_count: unpinned_count(tabs.iter().filter(|tab| tab.window_id == window.id)),
                name: self
                    .window_names
                    .get(&window.id)
                    .cloned()
                    .unwrap_or_else(|| format!("Window {}", window.id.0)),
                focused: window.focused,
            })
            .collect()
    }

    fn tab_group_summaries(&mut self) -> Response {
        let unavailable = Response::TabGroups {
            available: false,
            groups: Vec::new(),
        };
        if !self.provider.tab_groups_available() {
            return unavailable;
        }
        let groups = match self.provider.tab_groups() {
            Ok(groups) => groups,
            Err(err) => {
                warn!("{}", TabvaultError::provider("tab_groups", err));
                return unavailable;
            }
        };
        let mut counts: BTreeMap<GroupId, usize> = BTreeMap::new();
        for tab in self.open_tabs(None) {
            if let Some(group_id) = tab.real_group() {
                *counts.entry(group_id).or_default() += 1;
            }
        }
        let groups = groups
            .into_iter()
            .map(|group| {
                let title = self
                    .settings
                    .tab_group_names
                    .get(&group.id)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .or_else(|| group.title.clone().filter(|title| !title.is_empty()))
                    .unwrap_or_else(|| format!("Group {}", group.id.0));
                TabGroupSummary {
                    id: group.id,
                    title,
                    color: group.color,
                    tab_count: counts.get(&group.id).copied().unwrap_or(0),
                }
            })
            .collect();
        Response::TabGroups {
            available: true,
            groups,
        }
    }

    fn stats(&mut self) -> Stats {
        let tabs = self.open_tabs(None);
        Stats {
            total_tabs: unpinned_count(&tabs),
            archived_count: self.archive.len(),
            tracked_tabs: self.activity.tab_index().len(),
        }
    }

    fn sweep_scope(&mut self, tabs: &[TabInfo], settings: &Settings, now: Timestamp) -> usize {
        if unpinned_count(tabs) < settings.min_tabs_for_archiving {
            return 0;
        }
        let targets: Vec<&TabInfo> = {
            let policy = ArchivePolicy::new(settings);
            tabs.iter()
                .filter(|tab| policy.evaluate(tab, &self.activity, now) != Verdict::Keep)
                .collect()
        };
        for tab in &targets {
            self.archive_tab(tab, now);
        }
        targets.len()
    }

    fn scope_tabs(&mut self, window_id: WindowId, group_id: Option<GroupId>) -> Vec<TabInfo> {
        let mut tabs = self.open_tabs(Some(window_id));
        if let Some(group_id) = group_id {
            tabs.retain(|tab| tab.real_group() == Some(group_id));
        }
        tabs
    }

    fn per_group_scope(&self) -> bool {
        self.settings.scope == Scope::PerTabGroup && self.provider.tab_groups_available()
    }

    fn observe(&mut self, tab_id: TabId, url: &str, now: Timestamp) {
        if self.activity.observe(tab_id, url, now) {
            self.persist_activity();
        }
    }

    fn open_tabs(&mut self, window_id: Option<WindowId>) -> Vec<TabInfo> {
        match self.provider.tabs(window_id) {
            Ok(tabs) => tabs,
            Err(err) => {
                warn!("{}", TabvaultError::provider("tabs", err));
                Vec::new()
            }
        }
    }

    fn close_tab(&mut self, tab_id: TabId) {
        if let Err(err) = self.provider.remove_tab(tab_id) {
            warn!("{}", TabvaultError::provider("remove_tab", err));
        }
    }

    /// Closes a tab that was just opened. Its URL keeps its history.
    fn close_new_tab(&mut self, tab_id: TabId) {
        self.close_tab(tab_id);
        if self.activity.remove_tab(tab_id).is_some() {
            self.persist_activity();
        }
    }

    fn persist_archive(&mut self) {
        store(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::Archive,
            self.archive.entries(),
        );
    }

    fn persist_activity(&mut self) {
        store(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::UrlActivity,
            self.activity.url_activity(),
        );
        store(
            &mut self.persistence,
            StorageArea::Local,
            StorageKey::TabActivity,
            self.activity.tab_index(),
        );
    }
}

fn load<P: Persistence, V: DeserializeOwned>(
    persistence: &mut P,
    area: StorageArea,
    key: StorageKey,
) -> Result<Option<V>, TabvaultError> {
    let unavailable = |message: String| match area {
        StorageArea::Local => TabvaultError::StorageUnavailable(message),
        StorageArea::Sync => TabvaultError::SyncUnavailable(message),
    };
    let Some(value) = persistence
        .load(area, key)
        .map_err(|err| unavailable(format!("reading {key}: {err}")))?
    else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|err| unavailable(format!("decoding {key}: {err}")))
}

fn load_or_warn<P: Persistence, V: DeserializeOwned>(
    persistence: &mut P,
    area: StorageArea,
    key: StorageKey,
) -> Option<V> {
    load(persistence, area, key).unwrap_or_else(|err| {
        warn!("{err}; using defaults");
        None
    })
}

fn store<P: Persistence, V: Serialize + ?Sized>(
    persistence: &mut P,
    area: StorageArea,
    key: StorageKey,
    value: &V,
) -> bool {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(err) => {
            warn!("could not encode {key}: {err}");
            return false;
        }
    };
    match persistence.save(area, key, &value) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                "{}",
                TabvaultError::StorageUnavailable(format!("writing {key} to {area}: {err}"))
            );
            false
        }
    }
}
