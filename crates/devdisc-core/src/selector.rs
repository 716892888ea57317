//! Choosing one device out of an enumeration.

use tracing::debug;

use crate::class::DeviceClass;
use crate::device::Device;
use crate::error::{DiscoveryError, Result};

/// Scores candidate devices. Higher is better; `None` rejects the device.
pub trait DeviceSelector {
    fn score(&self, device: &Device) -> Option<i32>;

    /// Short label used in logs and errors.
    fn describe(&self) -> String;
}

/// Prefers GPUs, then other accelerators, then CPUs, then the host.
///
/// Devices that cannot be classified are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSelector;

impl DefaultSelector {
    pub const fn class_score(class: DeviceClass) -> i32 {
        match class {
            DeviceClass::Gpu => 500,
            DeviceClass::Accelerator => 400,
            DeviceClass::Cpu => 300,
            DeviceClass::Host => 100,
        }
    }
}

impl DeviceSelector for DefaultSelector {
    fn score(&self, device: &Device) -> Option<i32> {
        device.class_of().ok().map(Self::class_score)
    }

    fn describe(&self) -> String {
        "default".to_owned()
    }
}

/// Accepts only devices of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSelector(pub DeviceClass);

impl DeviceSelector for ClassSelector {
    fn score(&self, device: &Device) -> Option<i32> {
        match device.class_of() {
            Ok(class) if class == self.0 => Some(0),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        format!("{}-only", self.0)
    }
}

/// Wraps a closure as a selector.
pub struct FnSelector<F> {
    label: String,
    score: F,
}

impl<F> FnSelector<F>
where
    F: Fn(&Device) -> Option<i32>,
{
    pub fn new(label: impl Into<String>, score: F) -> Self {
        Self { label: label.into(), score }
    }
}

impl<F> DeviceSelector for FnSelector<F>
where
    F: Fn(&Device) -> Option<i32>,
{
    fn score(&self, device: &Device) -> Option<i32> {
        (self.score)(device)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Pick the highest-scored device. Ties keep the earliest device.
pub fn select_device(devices: &[Device], selector: &dyn DeviceSelector) -> Result<Device> {
    let mut best: Option<(i32, &Device)> = None;
    for device in devices {
        let Some(score) = selector.score(device) else {
            continue;
        };
        best = match best {
            Some((current, kept)) if current >= score => Some((current, kept)),
            _ => Some((score, device)),
        };
    }

    match best {
        Some((score, device)) => {
            debug!(selector = %selector.describe(), score, device = ?device, "device selected");
            Ok(device.clone())
        }
        None => Err(DiscoveryError::NoDeviceSelected { selector: selector.describe() }),
    }
}
