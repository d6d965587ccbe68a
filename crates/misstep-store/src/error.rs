//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the mastery stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The progress file exists but could not be read or written.
    #[error("progress file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The progress file is not valid JSON of the expected shape.
    #[error("corrupted progress file {path}: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A writer panicked while holding the record lock.
    #[error("mastery records lock poisoned")]
    Poisoned,
}
