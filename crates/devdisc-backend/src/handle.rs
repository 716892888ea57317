//! Opaque identity keys issued by device backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Next id handed out by [`BackendId::next`]. Id `0` is reserved for the host.
static NEXT_BACKEND_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies the backend instance that issued a [`BackendHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BackendId(u32);

impl BackendId {
    /// The built-in host representation. Never returned by [`BackendId::next`].
    pub const HOST: Self = Self(0);

    /// Allocate a fresh, process-unique backend id.
    pub fn next() -> Self {
        Self(NEXT_BACKEND_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend#{}", self.0)
    }
}

/// Identity key of one backend-enumerated device.
///
/// A handle is a plain value: it does not own the device resource and stays
/// comparable after the device disappears. Raw value `0` is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BackendHandle {
    backend: BackendId,
    raw: u64,
}

impl BackendHandle {
    /// The null handle. Backends never issue it for a live device.
    pub const NULL: Self = Self { backend: BackendId::HOST, raw: 0 };

    const HOST_RAW: u64 = u64::MAX;

    /// Build a handle from the issuing backend and its raw descriptor.
    pub const fn new(backend: BackendId, raw: u64) -> Self {
        Self { backend, raw }
    }

    /// Key of the built-in host device.
    pub const fn host() -> Self {
        Self { backend: BackendId::HOST, raw: Self::HOST_RAW }
    }

    pub const fn backend(self) -> BackendId {
        self.backend
    }

    pub const fn raw(self) -> u64 {
        self.raw
    }

    pub const fn is_null(self) -> bool {
        self.raw == 0
    }

    /// True only for the built-in host key from [`BackendHandle::host`].
    pub const fn is_builtin_host(self) -> bool {
        self.backend.0 == BackendId::HOST.0 && self.raw == Self::HOST_RAW
    }
}

impl fmt::Display for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else if self.is_builtin_host() {
            write!(f, "host")
        } else {
            write!(f, "{}:{:#x}", self.backend.0, self.raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_ids_are_unique_and_never_host() {
        let a = BackendId::next();
        let b = BackendId::next();
        assert_ne!(a, b);
        assert_ne!(a, BackendId::HOST);
        assert_ne!(b, BackendId::HOST);
    }

    #[test]
    fn handles_from_different_backends_do_not_collide() {
        let a = BackendHandle::new(BackendId::next(), 7);
        let b = BackendHandle::new(BackendId::next(), 7);
        assert_ne!(a, b);
    }

    #[test]
    fn null_and_host_are_distinct() {
        assert!(BackendHandle::NULL.is_null());
        assert!(!BackendHandle::NULL.is_builtin_host());
        assert!(BackendHandle::host().is_builtin_host());
        assert!(!BackendHandle::host().is_null());
        assert_ne!(BackendHandle::NULL, BackendHandle::host());
    }

    #[test]
    fn display_forms() {
        assert_eq!(BackendHandle::NULL.to_string(), "null");
        assert_eq!(BackendHandle::host().to_string(), "host");
        let id = BackendId::next();
        let h = BackendHandle::new(id, 0x2a);
        assert_eq!(h.to_string(), format!("{}:0x2a", id.get()));
    }
}
