//! In-memory backend with a scripted device list.
//!
//! Used by tests and demos to model every state a real driver stack can be
//! in: healthy, empty, unreachable, or losing a device between enumeration
//! and a later query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::backend::DeviceBackend;
use crate::capability::{Capability, CapabilityValue, DeviceTypeMask};
use crate::error::{BackendError, Result};
use crate::handle::{BackendHandle, BackendId};

#[derive(Debug, Clone)]
struct SimulatedDevice {
    raw: u64,
    mask: DeviceTypeMask,
    name: String,
    vendor: String,
    compute_units: u32,
}

#[derive(Debug, Default)]
struct State {
    devices: Vec<SimulatedDevice>,
    unavailable: Option<String>,
}

/// Builder for [`SimulatedBackend`].
#[derive(Debug)]
pub struct SimulatedBackendBuilder {
    name: String,
    devices: Vec<SimulatedDevice>,
    unavailable: Option<String>,
}

impl SimulatedBackendBuilder {
    /// Add a device with a generated name and vendor.
    pub fn device(self, raw: u64, mask: DeviceTypeMask) -> Self {
        let name = format!("simulated {mask} device {raw}");
        self.named_device(raw, mask, name, "Simulated Devices Inc.")
    }

    /// Add a device with an explicit name and vendor.
    pub fn named_device(
        mut self,
        raw: u64,
        mask: DeviceTypeMask,
        name: impl Into<String>,
        vendor: impl Into<String>,
    ) -> Self {
        self.devices.push(SimulatedDevice {
            raw,
            mask,
            name: name.into(),
            vendor: vendor.into(),
            compute_units: 1,
        });
        self
    }

    /// Set the compute-unit count of the most recently added device.
    pub fn compute_units(mut self, units: u32) -> Self {
        if let Some(last) = self.devices.last_mut() {
            last.compute_units = units;
        }
        self
    }

    /// Start in the unreachable state.
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    pub fn build(self) -> SimulatedBackend {
        SimulatedBackend {
            id: BackendId::next(),
            name: self.name,
            state: RwLock::new(State { devices: self.devices, unavailable: self.unavailable }),
            queries: AtomicU64::new(0),
        }
    }
}

/// A [`DeviceBackend`] whose devices are scripted up front and can be
/// mutated at runtime.
///
/// Raw descriptors are reported as given, in insertion order; a raw `0` or a
/// repeated raw value is reported verbatim so callers can exercise their
/// handling of misbehaving backends.
#[derive(Debug)]
pub struct SimulatedBackend {
    id: BackendId,
    name: String,
    state: RwLock<State>,
    queries: AtomicU64,
}

impl SimulatedBackend {
    pub fn builder(name: impl Into<String>) -> SimulatedBackendBuilder {
        SimulatedBackendBuilder { name: name.into(), devices: Vec::new(), unavailable: None }
    }

    /// Handle this backend issues for `raw`.
    pub fn handle(&self, raw: u64) -> BackendHandle {
        BackendHandle::new(self.id, raw)
    }

    /// Drop a device, as if it had been unplugged. Returns `true` if found.
    pub fn remove_device(&self, raw: u64) -> bool {
        let mut state = self.write();
        let before = state.devices.len();
        state.devices.retain(|d| d.raw != raw);
        let removed = state.devices.len() != before;
        debug!(backend = %self.name, raw, removed, "simulated device removal");
        removed
    }

    /// Make every subsequent call fail with [`BackendError::Unavailable`].
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        self.write().unavailable = Some(reason.into());
    }

    pub fn set_available(&self) {
        self.write().unavailable = None;
    }

    /// Number of capability queries answered or refused so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        // A panicking writer cannot leave the device list half-updated.
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_available(&self, state: &State) -> Result<()> {
        match &state.unavailable {
            Some(reason) => Err(BackendError::Unavailable {
                backend: self.name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DeviceBackend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> BackendId {
        self.id
    }

    fn list_devices(&self) -> Result<Vec<BackendHandle>> {
        let state = self.read();
        self.check_available(&state)?;
        Ok(state.devices.iter().map(|d| self.handle(d.raw)).collect())
    }

    fn query_capability(
        &self,
        handle: BackendHandle,
        capability: Capability,
    ) -> Result<CapabilityValue> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let state = self.read();
        self.check_available(&state)?;

        if !self.owns(handle) {
            return Err(BackendError::InvalidHandle { handle });
        }
        let device = state
            .devices
            .iter()
            .find(|d| d.raw == handle.raw())
            .ok_or(BackendError::InvalidHandle { handle })?;

        match capability {
            Capability::DeviceType => Ok(CapabilityValue::DeviceType(device.mask)),
            Capability::Name => Ok(CapabilityValue::Text(device.name.clone())),
            Capability::Vendor => Ok(CapabilityValue::Text(device.vendor.clone())),
            Capability::MaxComputeUnits => Ok(CapabilityValue::Count(device.compute_units)),
            Capability::DriverVersion => {
                Err(BackendError::UnsupportedCapability { handle, capability })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_devices() -> SimulatedBackend {
        SimulatedBackend::builder("sim")
            .device(1, DeviceTypeMask::HOST)
            .device(2, DeviceTypeMask::CPU)
            .device(3, DeviceTypeMask::GPU)
            .build()
    }

    #[test]
    fn lists_in_insertion_order() {
        let backend = three_devices();
        let raws: Vec<u64> = backend.list_devices().unwrap().iter().map(|h| h.raw()).collect();
        assert_eq!(raws, vec![1, 2, 3]);
    }

    #[test]
    fn removed_device_becomes_invalid() {
        let backend = three_devices();
        let gpu = backend.handle(3);
        assert!(backend.remove_device(3));
        assert!(!backend.remove_device(3));
        let err = backend.query_capability(gpu, Capability::DeviceType).unwrap_err();
        assert_eq!(err, BackendError::InvalidHandle { handle: gpu });
    }

    #[test]
    fn foreign_handle_is_invalid() {
        let a = three_devices();
        let b = three_devices();
        let err = a.query_capability(b.handle(1), Capability::Name).unwrap_err();
        assert!(matches!(err, BackendError::InvalidHandle { .. }));
    }

    #[test]
    fn unavailable_backend_refuses_everything() {
        let backend = three_devices();
        backend.set_unavailable("driver unloaded");
        assert!(backend.list_devices().unwrap_err().is_unavailable());
        assert!(backend.query_capability(backend.handle(1), Capability::Name).is_err());
        backend.set_available();
        assert_eq!(backend.list_devices().unwrap().len(), 3);
    }

    #[test]
    fn driver_version_is_unsupported() {
        let backend = three_devices();
        let err = backend.query_capability(backend.handle(2), Capability::DriverVersion);
        assert!(matches!(err, Err(BackendError::UnsupportedCapability { .. })));
    }

    #[test]
    fn query_count_tracks_calls() {
        let backend = three_devices();
        assert_eq!(backend.query_count(), 0);
        let _ = backend.query_capability(backend.handle(1), Capability::DeviceType);
        let _ = backend.query_capability(backend.handle(9), Capability::DeviceType);
        assert_eq!(backend.query_count(), 2);
    }
}
