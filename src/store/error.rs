//! Error types for snapshot persistence

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading or saving a status snapshot
#[derive(Debug)]
pub enum StoreError {
    /// The cooperative file lock was not acquired within the timeout
    LockTimeout { path: PathBuf, waited: Duration },

    /// The snapshot could not be serialized
    Serialization(String),

    /// I/O error (file access, etc.)
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockTimeout { path, waited } => write!(
                f,
                "could not lock {} within {} seconds",
                path.display(),
                waited.as_secs()
            ),
            StoreError::Serialization(msg) => write!(f, "snapshot serialization error: {}", msg),
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}
