use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde_json::Value;

use crate::error::TabvaultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageArea {
    Local,
    /// Cross-device area. Only the settings document is written here.
    Sync,
}

impl Display for StorageArea {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Local => f.write_str("local"),
            Self::Sync => f.write_str("sync"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Settings,
    Archive,
    TabActivity,
    UrlActivity,
    WindowNames,
}

impl StorageKey {
    pub const ALL: [StorageKey; 5] = [
        Self::Settings,
        Self::Archive,
        Self::TabActivity,
        Self::UrlActivity,
        Self::WindowNames,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Archive => "archive",
            Self::TabActivity => "tabActivity",
            Self::UrlActivity => "urlActivity",
            Self::WindowNames => "windowNames",
        }
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Key-value store the engine persists through.
///
/// Values are plain JSON documents. `load` returns `Ok(None)` for a key that
/// was never written.
pub trait Persistence {
    type Error: Display;

    fn load(&mut self, area: StorageArea, key: StorageKey) -> Result<Option<Value>, Self::Error>;

    fn save(&mut self, area: StorageArea, key: StorageKey, value: &Value)
        -> Result<(), Self::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

impl Persistence for NoopPersistence {
    type Error = Infallible;

    fn load(
        &mut self,
        _area: StorageArea,
        _key: StorageKey,
    ) -> Result<Option<Value>, Self::Error> {
        Ok(None)
    }

    fn save(
        &mut self,
        _area: StorageArea,
        _key: StorageKey,
        _value: &Value,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// In-process store. The sync area can be switched off to mimic a browser
/// without cross-device storage.
#[derive(Debug, Clone)]
pub struct MemoryPersistence {
    values: BTreeMap<(StorageArea, StorageKey), Value>,
    sync_available: bool,
    writes: usize,
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            sync_available: true,
            writes: 0,
        }
    }
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_sync() -> Self {
        Self {
            sync_available: false,
            ..Self::default()
        }
    }

    pub fn get(&self, area: StorageArea, key: StorageKey) -> Option<&Value> {
        self.values.get(&(area, key))
    }

    pub fn insert(&mut self, area: StorageArea, key: StorageKey, value: Value) {
        self.values.insert((area, key), value);
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    fn check_area(&self, area: StorageArea) -> Result<(), TabvaultError> {
        if area == StorageArea::Sync && !self.sync_available {
            return Err(TabvaultError::SyncUnavailable(
                "sync area is disabled".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Persistence for MemoryPersistence {
    type Error = TabvaultError;

    fn load(&mut self, area: StorageArea, key: StorageKey) -> Result<Option<Value>, Self::Error> {
        self.check_area(area)?;
        Ok(self.values.get(&(area, key)).cloned())
    }

    fn save(
        &mut self,
        area: StorageArea,
        key: StorageKey,
        value: &Value,
    ) -> Result<(), Self::Error> {
        self.check_area(area)?;
        self.values.insert((area, key), value.clone());
        self.writes += 1;
        Ok(())
    }
}
