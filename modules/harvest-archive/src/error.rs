use std::time::Duration;

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Harvest(#[from] harvest_common::HarvestError),
}

/// Why a single timemap lookup produced nothing usable. Never fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("lookup exited with status {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("failed to launch lookup: {0}")]
    Spawn(#[from] std::io::Error),
}
