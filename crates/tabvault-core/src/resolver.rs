use std::borrow::Cow;

use crate::ids::{GroupId, WindowId};
use crate::settings::{Scope, Settings};
use crate::tab::TabInfo;

pub fn resolve_for_window(settings: &Settings, window_id: Option<WindowId>) -> Cow<'_, Settings> {
    if settings.scope != Scope::PerWindow {
        return Cow::Borrowed(settings);
    }
    let Some(window_id) = window_id else {
        return Cow::Borrowed(settings);
    };
    match settings.window_overrides.get(&window_id) {
        Some(overrides) => Cow::Owned(overrides.apply_to(settings)),
        None => Cow::Borrowed(settings),
    }
}

pub fn resolve_for_group(settings: &Settings, group_id: Option<GroupId>) -> Cow<'_, Settings> {
    if settings.scope != Scope::PerTabGroup {
        return Cow::Borrowed(settings);
    }
    let Some(group_id) = GroupId::real(group_id) else {
        return Cow::Borrowed(settings);
    };
    match settings.tab_group_overrides.get(&group_id) {
        Some(overrides) => Cow::Owned(overrides.apply_to(settings)),
        None => Cow::Borrowed(settings),
    }
}

pub fn resolve_for_tab<'a>(settings: &'a Settings, tab: &TabInfo) -> Cow<'a, Settings> {
    resolve_for_group(settings, tab.group_id)
}
