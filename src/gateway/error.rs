//! Error types for management-command execution

use std::fmt;
use std::time::Duration;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while executing a management command
#[derive(Debug)]
pub enum GatewayError {
    /// The management CLI binary could not be found
    Unavailable(String),

    /// The command exceeded its hard timeout
    Timeout(Duration),

    /// The CLI ran but exited non-zero / rejected its arguments
    Execution { code: Option<i32>, stderr: String },

    /// Spawning or talking to the subprocess failed
    Io(std::io::Error),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unavailable(binary) => {
                write!(f, "management CLI binary not found: {}", binary)
            }
            GatewayError::Timeout(timeout) => {
                write!(f, "command timed out after {} seconds", timeout.as_secs())
            }
            GatewayError::Execution { code, stderr } => match code {
                Some(code) => write!(f, "command failed (exit {}): {}", code, stderr),
                None => write!(f, "command failed: {}", stderr),
            },
            GatewayError::Io(err) => write!(f, "command execution I/O error: {}", err),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err)
    }
}
