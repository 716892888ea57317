//! Errors reported by device backends.

use crate::capability::Capability;
use crate::handle::BackendHandle;

/// Errors from backend discovery and capability queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend cannot be reached at all (driver stack missing, runtime
    /// not loaded, ...).
    #[error("backend '{backend}' unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    /// The handle does not name a live device on this backend.
    #[error("invalid device handle {handle}")]
    InvalidHandle { handle: BackendHandle },

    /// The backend has no answer for this capability on this device.
    #[error("capability '{capability}' not supported by device {handle}")]
    UnsupportedCapability { handle: BackendHandle, capability: Capability },

    /// The query reached the backend but failed.
    #[error("query on device {handle} failed: {reason}")]
    Query { handle: BackendHandle, reason: String },
}

impl BackendError {
    /// Whether this error means the backend as a whole is unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Unavailable { .. })
    }
}

/// Convenience result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
