use url::Url;

use crate::activity::{ActivityTracker, Timestamp};
use crate::policy::ArchivePolicy;
use crate::settings::{MaxTabsAction, SiteLimit};
use crate::tab::{unpinned_count, TabInfo};

/// Hostname of `url` with a leading `www.` removed.
pub fn site_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// Exact match, or `limit_domain` is a parent of `tab_domain`.
pub fn domain_matches(tab_domain: &str, limit_domain: &str) -> bool {
    if tab_domain.is_empty() || limit_domain.is_empty() {
        return false;
    }
    tab_domain == limit_domain
        || tab_domain
            .strip_suffix(limit_domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub fn matching_site_limit<'a>(limits: &'a [SiteLimit], url: &str) -> Option<&'a SiteLimit> {
    let domain = site_domain(url)?;
    limits
        .iter()
        .find(|limit| domain_matches(&domain, &limit.domain))
}

/// Non-pinned tabs that fall under `limit`.
pub fn count_site_tabs(tabs: &[TabInfo], limit: &SiteLimit) -> usize {
    tabs.iter()
        .filter(|tab| !tab.pinned)
        .filter(|tab| {
            site_domain(&tab.url).is_some_and(|domain| domain_matches(&domain, &limit.domain))
        })
        .count()
}

/// Returns the site limit `new_tab` violates, if any.
pub fn site_limit_violation<'a>(
    limits: &'a [SiteLimit],
    new_tab: &TabInfo,
    scope_tabs: &[TabInfo],
) -> Option<&'a SiteLimit> {
    let limit = matching_site_limit(limits, &new_tab.url)?;
    (count_site_tabs(scope_tabs, limit) > limit.max_tabs).then_some(limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityDecision {
    /// Fewer non-pinned tabs than `minTabsForArchiving`; scope is left alone.
    BelowMinimum,
    WithinLimit,
    CloseNew,
    ArchiveOldest { excess: usize },
}

pub fn decide(
    scope_tabs: &[TabInfo],
    min_tabs_for_archiving: usize,
    max_tabs: usize,
    action: MaxTabsAction,
    new_tab: Option<&TabInfo>,
) -> CapacityDecision {
    let count = unpinned_count(scope_tabs);
    if count < min_tabs_for_archiving {
        return CapacityDecision::BelowMinimum;
    }
    if count <= max_tabs {
        return CapacityDecision::WithinLimit;
    }
    let closable_new_tab = new_tab.is_some_and(|tab| !tab.pinned);
    match action {
        MaxTabsAction::CloseNew if closable_new_tab => CapacityDecision::CloseNew,
        _ => CapacityDecision::ArchiveOldest {
            excess: count - max_tabs,
        },
    }
}

/// Picks up to `count` eviction candidates, least recently active first.
///
/// Protected tabs are never candidates. The sort is stable so equal
/// timestamps keep their input order.
pub fn oldest_candidates(
    scope_tabs: &[TabInfo],
    policy: &ArchivePolicy<'_>,
    tracker: &ActivityTracker,
    count: usize,
    now: Timestamp,
) -> Vec<TabInfo> {
    let mut candidates: Vec<(Timestamp, &TabInfo)> = scope_tabs
        .iter()
        .filter(|tab| !policy.is_protected(tab))
        .map(|tab| (tracker.last_active(&tab.url, now), tab))
        .collect();
    candidates.sort_by_key(|(last_active, _)| *last_active);
    candidates
        .into_iter()
        .take(count)
        .map(|(_, tab)| tab.clone())
        .collect()
}
