use serde::{Deserialize, Serialize};

use crate::archive::ArchiveEntry;
use crate::ids::{ArchiveEntryId, GroupId, WindowId};
use crate::settings::{Settings, SettingsOverride};

/// Requests coming from the popup or the context menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    GetSettings,
    UpdateSettings {
        settings: Settings,
    },
    GetWindows,
    SetWindowName {
        window_id: WindowId,
        name: String,
    },
    SetWindowOverride {
        window_id: WindowId,
        overrides: SettingsOverride,
    },
    RemoveWindowOverride {
        window_id: WindowId,
    },
    GetCurrentWindow,
    GetTabGroups,
    SetTabGroupOverride {
        group_id: GroupId,
        overrides: SettingsOverride,
    },
    RemoveTabGroupOverride {
        group_id: GroupId,
    },
    IsTabGroupsAvailable,
    GetArchive,
    RestoreTab {
        id: ArchiveEntryId,
        url: String,
    },
    DeleteFromArchive {
        id: ArchiveEntryId,
    },
    ClearArchive,
    AddNeverArchivePattern {
        pattern: String,
    },
    RemoveNeverArchivePattern {
        pattern: String,
    },
    AddSiteLimit {
        domain: String,
        max_tabs: usize,
    },
    RemoveSiteLimit {
        domain: String,
    },
    GetStats,
    NeverArchiveTab {
        url: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetSettings => "getSettings",
            Self::UpdateSettings { .. } => "updateSettings",
            Self::GetWindows => "getWindows",
            Self::SetWindowName { .. } => "setWindowName",
            Self::SetWindowOverride { .. } => "setWindowOverride",
            Self::RemoveWindowOverride { .. } => "removeWindowOverride",
            Self::GetCurrentWindow => "getCurrentWindow",
            Self::GetTabGroups => "getTabGroups",
            Self::SetTabGroupOverride { .. } => "setTabGroupOverride",
            Self::RemoveTabGroupOverride { .. } => "removeTabGroupOverride",
            Self::IsTabGroupsAvailable => "isTabGroupsAvailable",
            Self::GetArchive => "getArchive",
            Self::RestoreTab { .. } => "restoreTab",
            Self::DeleteFromArchive { .. } => "deleteFromArchive",
            Self::ClearArchive => "clearArchive",
            Self::AddNeverArchivePattern { .. } => "addNeverArchivePattern",
            Self::RemoveNeverArchivePattern { .. } => "removeNeverArchivePattern",
            Self::AddSiteLimit { .. } => "addSiteLimit",
            Self::RemoveSiteLimit { .. } => "removeSiteLimit",
            Self::GetStats => "getStats",
            Self::NeverArchiveTab { .. } => "neverArchiveTab",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub id: WindowId,
    pub tab_count: usize,
    pub name: String,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupSummary {
    pub id: GroupId,
    pub title: String,
    pub color: Option<String>,
    pub tab_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_tabs: usize,
    pub archived_count: usize,
    pub tracked_tabs: usize,
}

/// Reply body for a [`Command`]. Serialized without a tag: the caller knows
/// which shape to expect from the action it sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Response {
    Settings(Settings),
    Ack {
        success: bool,
    },
    Windows(Vec<WindowSummary>),
    CurrentWindow {
        window_id: Option<WindowId>,
    },
    TabGroups {
        available: bool,
        groups: Vec<TabGroupSummary>,
    },
    Availability {
        available: bool,
    },
    Archive(Vec<ArchiveEntry>),
    Stats(Stats),
}

impl Response {
    pub fn ack(success: bool) -> Self {
        Self::Ack { success }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn commands_parse_from_action_tagged_json() {
        let command: Command = serde_json::from_value(json!({
            "action": "addSiteLimit",
            "domain": "youtube.com",
            "maxTabs": 3
        }))
        .expect("addSiteLimit should parse");
        assert_eq!(
            command,
            Command::AddSiteLimit {
                domain: "youtube.com".to_owned(),
                max_tabs: 3,
            }
        );

        let command: Command = serde_json::from_value(json!({
            "action": "setWindowOverride",
            "windowId": 5,
            "overrides": {"maxTabsPerWindow": 4}
        }))
        .expect("setWindowOverride should parse");
        let Command::SetWindowOverride {
            window_id,
            overrides,
        } = command
        else {
            panic!("unexpected command variant");
        };
        assert_eq!(window_id, WindowId(5));
        assert_eq!(overrides.max_tabs_per_window, Some(4));
        assert_eq!(overrides.archive_threshold, None);
    }

    #[test]
    fn unknown_action_is_rejected() {
        let result = serde_json::from_value::<Command>(json!({"action": "openApp"}));
        assert!(result.is_err());
    }

    #[test]
    fn responses_serialize_in_popup_shapes() {
        assert_eq!(
            serde_json::to_value(Response::ack(true)).expect("ack should serialize"),
            json!({"success": true})
        );
        assert_eq!(
            serde_json::to_value(Response::CurrentWindow {
                window_id: Some(WindowId(2)),
            })
            .expect("current window should serialize"),
            json!({"windowId": 2})
        );
        assert_eq!(
            serde_json::to_value(Response::Stats(Stats {
                total_tabs: 4,
                archived_count: 1,
                tracked_tabs: 3,
            }))
            .expect("stats should serialize"),
            json!({"totalTabs": 4, "archivedCount": 1, "trackedTabs": 3})
        );
    }
}
