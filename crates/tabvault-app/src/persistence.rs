use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::Value;
use tabvault_core::{Persistence, StorageArea, StorageKey};

use crate::config::AppConfig;
use crate::error::AppError;

/// One JSON document per key, one directory per storage area.
pub struct FilePersistence {
    local_dir: PathBuf,
    sync_dir: Option<PathBuf>,
}

impl FilePersistence {
    pub fn open(config: &AppConfig) -> Result<Self, AppError> {
        Self::open_dirs(&config.state_dir, config.sync_dir.as_deref())
    }

    pub fn open_dirs(local_dir: &Path, sync_dir: Option<&Path>) -> Result<Self, AppError> {
        fs::create_dir_all(local_dir).map_err(|err| AppError::io(local_dir, err))?;
        if let Some(sync_dir) = sync_dir {
            fs::create_dir_all(sync_dir).map_err(|err| AppError::io(sync_dir, err))?;
        }
        Ok(Self {
            local_dir: local_dir.to_path_buf(),
            sync_dir: sync_dir.map(Path::to_path_buf),
        })
    }

    fn path(&self, area: StorageArea, key: StorageKey) -> Result<PathBuf, AppError> {
        let dir = match area {
            StorageArea::Local => &self.local_dir,
            StorageArea::Sync => self.sync_dir.as_ref().ok_or(AppError::SyncDisabled)?,
        };
        Ok(dir.join(format!("{}.json", key.as_str())))
    }
}

impl Persistence for FilePersistence {
    type Error = AppError;

    fn load(&mut self, area: StorageArea, key: StorageKey) -> Result<Option<Value>, Self::Error> {
        let path = self.path(area, key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AppError::io(path, err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| AppError::Decode { path, source })
    }

    // Written to a sibling file first so a crash never leaves a torn document.
    fn save(
        &mut self,
        area: StorageArea,
        key: StorageKey,
        value: &Value,
    ) -> Result<(), Self::Error> {
        let path = self.path(area, key)?;
        let staging = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value).map_err(AppError::Encode)?;
        fs::write(&staging, bytes).map_err(|err| AppError::io(&staging, err))?;
        fs::rename(&staging, &path).map_err(|err| AppError::io(&path, err))?;
        debug!("wrote {area}/{key}");
        Ok(())
    }
}
