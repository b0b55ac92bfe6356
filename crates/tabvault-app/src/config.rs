use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::AppError;

const ENV_STATE_DIR: &str = "TABVAULT_STATE_DIR";
const ENV_SYNC_DIR: &str = "TABVAULT_SYNC_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    /// Directory shared across devices. `None` disables settings sync.
    pub sync_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|name| env::var_os(name))
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<OsString>) -> Result<Self, AppError> {
        let non_empty = |name: &str| var(name).filter(|value| !value.is_empty());
        let state_dir = match non_empty(ENV_STATE_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_state_dir(non_empty("HOME"))?,
        };
        Ok(Self {
            state_dir,
            sync_dir: non_empty(ENV_SYNC_DIR).map(PathBuf::from),
        })
    }
}

fn default_state_dir(home: Option<OsString>) -> Result<PathBuf, AppError> {
    if let Some(home) = home {
        return Ok(PathBuf::from(home).join(".tabvault"));
    }
    let cwd = env::current_dir().map_err(|err| AppError::StateDir(err.to_string()))?;
    Ok(cwd.join("target").join("tabvault"))
}
