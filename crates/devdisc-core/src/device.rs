//! The [`Device`] value type.
//!
//! A `Device` is a cheap, copyable reference to one backend-enumerated device.
//! Its identity is the backend handle it wraps: equality and hashing look at
//! that key only, never at the wrapper's address or at the backend object.
//! The backend keeps ownership of the underlying resource; every `Device`
//! merely holds a shared reference to the backend that issued its key.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use devdisc_backend::{
    BackendError, BackendHandle, Capability, CapabilityValue, DeviceBackend, DeviceTypeMask,
};
use tracing::warn;

use crate::class::DeviceClass;
use crate::classifier;
use crate::error::{DiscoveryError, Result};

/// Handle to a compute device with value semantics.
///
/// `Device::default()` is the built-in host device. A backend that reports
/// its host under [`BackendHandle::host`] (the system backend does)
/// enumerates it as this same device; a backend that issues its own host key
/// yields a distinct one. Cloning bumps a reference count and never touches
/// the backend.
///
/// # Examples
///
/// ```
/// use devdisc_core::{Device, DeviceClass};
///
/// let host = Device::default();
/// let copy = host.clone();
/// assert_eq!(host, copy);
/// assert_eq!(copy.class_of().unwrap(), DeviceClass::Host);
/// ```
#[derive(Clone)]
pub struct Device {
    key: BackendHandle,
    backend: Option<Arc<dyn DeviceBackend>>,
}

impl Device {
    /// The built-in host device. Never fails and needs no backend.
    pub fn host() -> Self {
        Self { key: BackendHandle::host(), backend: None }
    }

    /// A recognizably invalid device. All invalid devices compare equal.
    pub fn invalid() -> Self {
        Self { key: BackendHandle::NULL, backend: None }
    }

    /// Wrap a handle issued by `backend`.
    ///
    /// The built-in host key yields [`Device::host`]. A null handle, or one
    /// `backend` did not issue, yields [`Device::invalid`] instead of a device
    /// that would compare equal to the real one yet fail on first use.
    pub fn from_backend(handle: BackendHandle, backend: Arc<dyn DeviceBackend>) -> Self {
        if handle.is_builtin_host() {
            return Self::host();
        }
        if !backend.owns(handle) {
            warn!(backend = %backend.name(), %handle, "handle not issued by backend; producing invalid device");
            return Self::invalid();
        }
        Self { key: handle, backend: Some(backend) }
    }

    /// The identity key equality and hashing are based on.
    pub fn key(&self) -> BackendHandle {
        self.key
    }

    pub fn is_valid(&self) -> bool {
        !self.key.is_null()
    }

    /// Whether this is the built-in host device rather than one reported by
    /// a backend.
    pub fn is_builtin_host(&self) -> bool {
        self.key.is_builtin_host()
    }

    /// Name of the backend that issued this device's key.
    pub fn backend_name(&self) -> &str {
        match &self.backend {
            Some(backend) => backend.name(),
            None if self.is_builtin_host() => "host",
            None => "invalid",
        }
    }

    /// Move the device out, leaving the host device behind.
    ///
    /// The moved-from value never aliases the returned key (unless both are
    /// the host device) and stays fully usable.
    pub fn take(&mut self) -> Device {
        std::mem::take(self)
    }

    /// Raw capability query against the issuing backend.
    pub fn info(&self, capability: Capability) -> Result<CapabilityValue> {
        if !self.is_valid() {
            return Err(DiscoveryError::InvalidHandle);
        }
        match &self.backend {
            Some(backend) => Ok(backend.query_capability(self.key, capability)?),
            None => Ok(host_info(capability)),
        }
    }

    pub fn class_of(&self) -> Result<DeviceClass> {
        classifier::classify(self)
    }

    pub fn is_host(&self) -> Result<bool> {
        Ok(self.class_of()? == DeviceClass::Host)
    }

    pub fn is_cpu(&self) -> Result<bool> {
        Ok(self.class_of()? == DeviceClass::Cpu)
    }

    pub fn is_gpu(&self) -> Result<bool> {
        Ok(self.class_of()? == DeviceClass::Gpu)
    }

    pub fn is_accelerator(&self) -> Result<bool> {
        Ok(self.class_of()? == DeviceClass::Accelerator)
    }

    pub fn name(&self) -> Result<String> {
        self.text_info(Capability::Name)
    }

    pub fn vendor(&self) -> Result<String> {
        self.text_info(Capability::Vendor)
    }

    pub fn driver_version(&self) -> Result<String> {
        self.text_info(Capability::DriverVersion)
    }

    pub fn max_compute_units(&self) -> Result<u32> {
        let value = self.info(Capability::MaxComputeUnits)?;
        value.as_count().ok_or_else(|| self.mismatch(Capability::MaxComputeUnits, &value))
    }

    fn text_info(&self, capability: Capability) -> Result<String> {
        match self.info(capability)? {
            CapabilityValue::Text(text) => Ok(text),
            other => Err(self.mismatch(capability, &other)),
        }
    }

    fn mismatch(&self, capability: Capability, value: &CapabilityValue) -> DiscoveryError {
        DiscoveryError::Query(BackendError::Query {
            handle: self.key,
            reason: format!("unexpected answer {value:?} for '{capability}'"),
        })
    }
}

fn host_info(capability: Capability) -> CapabilityValue {
    match capability {
        Capability::DeviceType => CapabilityValue::DeviceType(DeviceTypeMask::HOST),
        Capability::Name => CapabilityValue::Text("host".to_owned()),
        Capability::Vendor => CapabilityValue::Text(std::env::consts::ARCH.to_owned()),
        Capability::MaxComputeUnits => CapabilityValue::Count(1),
        Capability::DriverVersion => CapabilityValue::Text(env!("CARGO_PKG_VERSION").to_owned()),
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::host()
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("key", &self.key)
            .field("backend", &self.backend_name())
            .finish()
    }
}
