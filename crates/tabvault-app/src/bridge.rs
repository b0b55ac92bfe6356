use serde::{Deserialize, Serialize};
use tabvault_core::{
    Command, Response, Settings, TabEvent, TabGroupInfo, TabId, TabInfo, WindowId, WindowInfo,
};

use crate::error::AppError;

/// Full enumeration of the browser, sent at startup and whenever the
/// extension side resynchronizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabSnapshot {
    pub tabs: Vec<TabInfo>,
    pub windows: Vec<WindowInfo>,
    pub groups: Vec<TabGroupInfo>,
    pub groups_available: bool,
    pub current_window: Option<WindowId>,
}

/// One line read from stdin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inbound {
    Command {
        request_id: u64,
        #[serde(flatten)]
        command: Command,
    },
    Event(TabEvent),
    Snapshot(TabSnapshot),
    SyncedSettings {
        settings: Settings,
    },
    Shutdown,
}

/// One line written to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outbound {
    Response { request_id: u64, body: Response },
    CreateTab { url: String },
    RemoveTab { tab_id: TabId },
}

pub fn parse_line(line: &str) -> Result<Inbound, AppError> {
    serde_json::from_str(line).map_err(AppError::Bridge)
}

pub fn encode(message: &Outbound) -> Result<String, AppError> {
    serde_json::to_string(message).map_err(AppError::Encode)
}
