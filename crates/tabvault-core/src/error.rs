use thiserror::Error;

/// Failure modes of the lifecycle engine.
///
/// None of these escape the engine: each is logged where it happens and the
/// affected call degrades to "no effect".
#[derive(Debug, Error)]
pub enum TabvaultError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("settings sync unavailable: {0}")]
    SyncUnavailable(String),
    #[error("tab provider operation `{operation}` failed: {message}")]
    ProviderOperationFailed {
        operation: &'static str,
        message: String,
    },
    #[error("invalid never-archive pattern `{pattern}`: {source}")]
    PatternCompile {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl TabvaultError {
    pub(crate) fn provider(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::ProviderOperationFailed {
            operation,
            message: err.to_string(),
        }
    }
}
