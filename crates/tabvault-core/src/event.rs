use serde::{Deserialize, Serialize};

use crate::ids::TabId;
use crate::tab::TabInfo;

/// Tab lifecycle notifications from the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TabEvent {
    Activated {
        tab_id: TabId,
    },
    /// `url` is set when the navigation changed the address; `status_complete`
    /// when the page finished loading. `tab` carries the tab's state after the
    /// change.
    Updated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status_complete: bool,
        tab: TabInfo,
    },
    Created {
        tab: TabInfo,
    },
    Removed {
        tab_id: TabId,
    },
}
