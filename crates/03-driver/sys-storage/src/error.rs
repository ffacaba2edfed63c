use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the configuration store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not read or write its medium.
    #[error("storage i/o on {}: {source}", path.display())]
    Io {
        /// File the operation touched.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Nothing has been saved under the key yet.
    #[error("no value stored under {namespace}/{key}")]
    NotFound {
        /// Namespace looked up.
        namespace: String,
        /// Key looked up.
        key: String,
    },
    /// The stored blob has the wrong size for a config record.
    #[error("stored config is {found} bytes, expected {expected}")]
    Corrupt {
        /// Encoded record size.
        expected: usize,
        /// Bytes actually stored.
        found: usize,
    },
    /// Namespace or key unusable as a storage name.
    #[error("invalid storage name `{0}`")]
    InvalidName(String),
}

/// Result alias for storage operations.
pub type StorageResult<T, E = StorageError> = Result<T, E>;
