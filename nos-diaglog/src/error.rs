//! Error handling module for the diagnostic log

use core::fmt;

/// Errors reported by the diagnostic log
///
/// None of these are fatal. Overwritten data is not an error at all: it is
/// the designed degradation mode of the ring and is never reported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagError {
    /// The context lock could not be taken within the configured wait
    LockTimeout,
    /// Every drain slot is occupied
    RegistryFull,
    /// Handle is out of range or does not name an occupied slot
    InvalidHandle,
    /// The context has not been initialized by its dispatch task yet
    NotInitialized,
    /// Configuration rejected by validation
    InvalidConfig(&'static str),
}

impl DiagError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, DiagError::LockTimeout | DiagError::NotInitialized)
    }
}

impl fmt::Display for DiagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagError::LockTimeout => write!(f, "Lock acquisition timed out"),
            DiagError::RegistryFull => write!(f, "All drain slots are occupied"),
            DiagError::InvalidHandle => write!(f, "Invalid drain handle"),
            DiagError::NotInitialized => write!(f, "Diagnostic log not initialized"),
            DiagError::InvalidConfig(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DiagError {}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, DiagError>;
