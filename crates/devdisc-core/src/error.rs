//! Discovery error taxonomy.

use devdisc_backend::{BackendError, BackendHandle};

/// Errors from device discovery, classification and selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// A backend could not be reached; the enumeration call failed as a whole.
    #[error("device discovery unavailable on backend '{backend}': {reason}")]
    DiscoveryUnavailable { backend: String, reason: String },

    /// The backend could not answer the class query for this device, e.g.
    /// because it was removed after enumeration.
    #[error("cannot classify device {handle}: {source}")]
    Classification {
        handle: BackendHandle,
        #[source]
        source: BackendError,
    },

    /// The device was built from a null handle.
    #[error("device has an invalid backend handle")]
    InvalidHandle,

    /// A device information query failed.
    #[error(transparent)]
    Query(#[from] BackendError),

    /// No device satisfied the selector.
    #[error("no device accepted by selector '{selector}'")]
    NoDeviceSelected { selector: String },

    /// A configuration value could not be parsed.
    #[error("invalid discovery configuration: {message}")]
    InvalidConfig { message: String },
}

impl DiscoveryError {
    /// True when enumeration itself failed, as opposed to an empty result or
    /// a per-device problem.
    pub fn is_discovery_failure(&self) -> bool {
        matches!(self, DiscoveryError::DiscoveryUnavailable { .. })
    }

    pub(crate) fn unavailable(err: &BackendError, backend: &str) -> Self {
        match err {
            BackendError::Unavailable { backend, reason } => {
                DiscoveryError::DiscoveryUnavailable {
                    backend: backend.clone(),
                    reason: reason.clone(),
                }
            }
            other => DiscoveryError::DiscoveryUnavailable {
                backend: backend.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

/// Convenience result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
