pub mod activity;
pub mod archive;
pub mod capacity;
pub mod command;
pub mod engine;
pub mod error;
pub mod event;
pub mod ids;
pub mod pattern;
pub mod persistence;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod scheduler;
pub mod settings;
pub mod tab;

pub use activity::{ActivityTracker, Timestamp};
pub use archive::{ArchiveEntry, ArchiveStore};
pub use command::{Command, Response, Stats, TabGroupSummary, WindowSummary};
pub use engine::Engine;
pub use error::TabvaultError;
pub use event::TabEvent;
pub use ids::{ArchiveEntryId, GroupId, TabId, WindowId};
pub use pattern::PatternMatcher;
pub use persistence::{MemoryPersistence, NoopPersistence, Persistence, StorageArea, StorageKey};
pub use policy::{ArchiveOutcome, ArchivePolicy, Verdict};
pub use provider::{InMemoryTabProvider, MemoryProviderError, ProviderEvent, TabProvider};
pub use scheduler::{cleanup_interval, SweepReport};
pub use settings::{MaxTabsAction, Scope, Settings, SettingsOverride, SiteLimit, TimeUnit};
pub use tab::{TabGroupInfo, TabInfo, WindowInfo};
