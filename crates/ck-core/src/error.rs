use thiserror::Error;

/// Error taxonomy for the content store surface.
///
/// `NotFound` and `Conflict` are user-visible outcomes (missing tag on
/// bind, duplicate tag name); `Storage` wraps everything the storage
/// layer can throw. Callers translate these into boolean/error results
/// at the IPC boundary instead of letting them escape uncaught.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}
