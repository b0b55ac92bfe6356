use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed bridge message: {0}")]
    Bridge(#[source] serde_json::Error),
    #[error("could not encode bridge message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid stored document {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sync storage is not configured")]
    SyncDisabled,
    #[error("cannot determine a state directory: {0}")]
    StateDir(String),
    #[error("runtime has stopped")]
    RuntimeStopped,
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
