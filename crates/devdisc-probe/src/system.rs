//! [`DeviceBackend`] over the probed machine.

use std::sync::{RwLock, RwLockReadGuard};

use devdisc_backend::{
    BackendError, BackendHandle, BackendId, Capability, CapabilityValue, DeviceBackend,
    DeviceTypeMask,
};
use tracing::{debug, info};

use crate::ProbeSnapshot;

const RAW_CPU: u64 = 2;
const RAW_CUDA: u64 = 0x10;
const RAW_ROCM: u64 = 0x11;
const RAW_ONEAPI: u64 = 0x12;
const RAW_NPU: u64 = 0x20;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SystemDevice {
    raw: u64,
    mask: DeviceTypeMask,
    name: String,
    vendor: String,
    compute_units: Option<u32>,
}

fn devices_from(snapshot: &ProbeSnapshot) -> Vec<SystemDevice> {
    let cores = u32::try_from(snapshot.cpu.core_count).unwrap_or(u32::MAX);
    let mut devices = vec![
        SystemDevice {
            raw: BackendHandle::host().raw(),
            mask: DeviceTypeMask::HOST,
            name: "host".to_owned(),
            vendor: snapshot.cpu.vendor.clone(),
            compute_units: Some(1),
        },
        SystemDevice {
            raw: RAW_CPU,
            mask: DeviceTypeMask::CPU,
            name: format!("{} CPU ({})", std::env::consts::ARCH, snapshot.cpu.simd_level),
            vendor: snapshot.cpu.vendor.clone(),
            compute_units: Some(cores),
        },
    ];

    let gpus = [
        (snapshot.gpu.cuda_available, RAW_CUDA, "CUDA GPU", "NVIDIA Corporation"),
        (snapshot.gpu.rocm_available, RAW_ROCM, "ROCm GPU", "Advanced Micro Devices, Inc."),
        (snapshot.gpu.oneapi_available, RAW_ONEAPI, "oneAPI GPU", "Intel(R) Corporation"),
    ];
    for (present, raw, name, vendor) in gpus {
        if present {
            devices.push(SystemDevice {
                raw,
                mask: DeviceTypeMask::GPU,
                name: name.to_owned(),
                vendor: vendor.to_owned(),
                compute_units: None,
            });
        }
    }

    if snapshot.npu.available {
        devices.push(SystemDevice {
            raw: RAW_NPU,
            mask: DeviceTypeMask::ACCELERATOR,
            name: "Intel NPU".to_owned(),
            vendor: "Intel(R) Corporation".to_owned(),
            compute_units: None,
        });
    }

    devices
}

/// Backend reporting the host, the CPU, each detected GPU runtime and an
/// NPU when present.
///
/// The host is reported under the built-in [`BackendHandle::host`] key, so it
/// is the same device as the default one callers build without a backend.
///
/// Probing happens once at construction and again on [`SystemBackend::rescan`];
/// enumeration in between always sees the same devices.
#[derive(Debug)]
pub struct SystemBackend {
    id: BackendId,
    devices: RwLock<Vec<SystemDevice>>,
}

impl SystemBackend {
    /// Probe the machine and build a backend from the result.
    pub fn detect() -> Self {
        Self::from_snapshot(&ProbeSnapshot::detect())
    }

    pub fn from_snapshot(snapshot: &ProbeSnapshot) -> Self {
        let devices = devices_from(snapshot);
        info!(devices = devices.len(), "system backend probed");
        Self { id: BackendId::next(), devices: RwLock::new(devices) }
    }

    /// Re-probe the machine. Returns `true` if the device set changed.
    pub fn rescan(&self) -> bool {
        self.replace(&ProbeSnapshot::detect())
    }

    /// Install a new snapshot. Returns `true` if the device set changed.
    pub fn replace(&self, snapshot: &ProbeSnapshot) -> bool {
        let fresh = devices_from(snapshot);
        let mut devices = match self.devices.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let changed = *devices != fresh;
        if changed {
            debug!(before = devices.len(), after = fresh.len(), "system device set changed");
            *devices = fresh;
        }
        changed
    }

    fn handle_of(&self, device: &SystemDevice) -> BackendHandle {
        if device.mask == DeviceTypeMask::HOST {
            BackendHandle::host()
        } else {
            BackendHandle::new(self.id, device.raw)
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<SystemDevice>> {
        match self.devices.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DeviceBackend for SystemBackend {
    fn name(&self) -> &str {
        "system"
    }

    fn id(&self) -> BackendId {
        self.id
    }

    fn list_devices(&self) -> devdisc_backend::Result<Vec<BackendHandle>> {
        Ok(self.read().iter().map(|d| self.handle_of(d)).collect())
    }

    fn query_capability(
        &self,
        handle: BackendHandle,
        capability: Capability,
    ) -> devdisc_backend::Result<CapabilityValue> {
        let devices = self.read();
        let device = devices
            .iter()
            .find(|d| self.handle_of(d) == handle)
            .ok_or(BackendError::InvalidHandle { handle })?;

        match capability {
            Capability::DeviceType => Ok(CapabilityValue::DeviceType(device.mask)),
            Capability::Name => Ok(CapabilityValue::Text(device.name.clone())),
            Capability::Vendor => Ok(CapabilityValue::Text(device.vendor.clone())),
            Capability::MaxComputeUnits => device
                .compute_units
                .map(CapabilityValue::Count)
                .ok_or(BackendError::UnsupportedCapability { handle, capability }),
            Capability::DriverVersion => {
                Err(BackendError::UnsupportedCapability { handle, capability })
            }
        }
    }
}
