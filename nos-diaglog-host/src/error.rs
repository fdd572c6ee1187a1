//! Error handling for the host runtime

use std::fmt;
use std::io;

use nos_diaglog::DiagError;

/// Errors reported by the host runtime
#[derive(Debug)]
pub enum HostError {
    /// Error from the log context
    Diag(DiagError),
    /// Socket or thread error
    Io(io::Error),
    /// The service was shut down before it became ready
    Stopped,
    /// Another logger is already installed
    LoggerInstalled,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Diag(err) => write!(f, "Diagnostic log error: {}", err),
            HostError::Io(err) => write!(f, "I/O error: {}", err),
            HostError::Stopped => write!(f, "Diagnostic service stopped"),
            HostError::LoggerInstalled => write!(f, "A logger is already installed"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::Diag(err) => Some(err),
            HostError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DiagError> for HostError {
    fn from(err: DiagError) -> Self {
        HostError::Diag(err)
    }
}

impl From<io::Error> for HostError {
    fn from(err: io::Error) -> Self {
        HostError::Io(err)
    }
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;
