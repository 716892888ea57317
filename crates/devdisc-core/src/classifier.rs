//! Maps backend device-type flags to exactly one [`DeviceClass`].
//!
//! Precedence when a backend sets several flags: Host > GPU > Accelerator > CPU.
//! A mask carrying none of the known flags (empty, or `CUSTOM` only) falls
//! into [`DeviceClass::Accelerator`].

use devdisc_backend::{
    BackendError, BackendHandle, Capability, CapabilityValue, DeviceBackend, DeviceTypeMask,
};

use crate::class::DeviceClass;
use crate::device::Device;
use crate::error::{DiscoveryError, Result};

const PRECEDENCE: [(DeviceTypeMask, DeviceClass); 4] = [
    (DeviceTypeMask::HOST, DeviceClass::Host),
    (DeviceTypeMask::GPU, DeviceClass::Gpu),
    (DeviceTypeMask::ACCELERATOR, DeviceClass::Accelerator),
    (DeviceTypeMask::CPU, DeviceClass::Cpu),
];

/// Pick the class for a raw flag mask. Pure and total.
pub fn class_from_mask(mask: DeviceTypeMask) -> DeviceClass {
    PRECEDENCE
        .iter()
        .find(|(flag, _)| mask.contains(*flag))
        .map_or(DeviceClass::Accelerator, |(_, class)| *class)
}

/// Classify a device by asking its backend for its type flags.
///
/// Fails with [`DiscoveryError::Classification`] when the backend cannot
/// answer, and with [`DiscoveryError::InvalidHandle`] for invalid devices.
pub fn classify(device: &Device) -> Result<DeviceClass> {
    let handle = device.key();
    let answer = device.info(Capability::DeviceType).map_err(|err| match err {
        DiscoveryError::Query(source) => DiscoveryError::Classification { handle, source },
        other => other,
    })?;
    class_from_answer(handle, &answer)
}

/// Classify a raw handle without wrapping it in a [`Device`].
///
/// Agrees with [`Device::from_backend`] followed by [`classify`]: the built-in
/// host key is Host, and a handle `backend` did not issue is invalid.
pub fn classify_handle(handle: BackendHandle, backend: &dyn DeviceBackend) -> Result<DeviceClass> {
    if handle.is_builtin_host() {
        return Ok(DeviceClass::Host);
    }
    if !backend.owns(handle) {
        return Err(DiscoveryError::InvalidHandle);
    }
    let answer = backend
        .query_capability(handle, Capability::DeviceType)
        .map_err(|source| DiscoveryError::Classification { handle, source })?;
    class_from_answer(handle, &answer)
}

fn class_from_answer(handle: BackendHandle, answer: &CapabilityValue) -> Result<DeviceClass> {
    let mask = answer.as_device_type().ok_or_else(|| DiscoveryError::Classification {
        handle,
        source: BackendError::Query {
            handle,
            reason: format!("expected device type flags, got {answer:?}"),
        },
    })?;
    Ok(class_from_mask(mask))
}
