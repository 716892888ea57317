//! The closed set of coarse device classes used for filtering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse category of a compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// The process's logical host representation.
    Host,
    Cpu,
    Gpu,
    /// Any other accelerator, including devices outside the known taxonomy.
    Accelerator,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 4] =
        [DeviceClass::Host, DeviceClass::Cpu, DeviceClass::Gpu, DeviceClass::Accelerator];

    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Host => "host",
            DeviceClass::Cpu => "cpu",
            DeviceClass::Gpu => "gpu",
            DeviceClass::Accelerator => "accelerator",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device class '{0}' (expected host, cpu, gpu or accelerator)")]
pub struct ParseDeviceClassError(pub String);

impl FromStr for DeviceClass {
    type Err = ParseDeviceClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(DeviceClass::Host),
            "cpu" => Ok(DeviceClass::Cpu),
            "gpu" => Ok(DeviceClass::Gpu),
            "acc" | "accelerator" => Ok(DeviceClass::Accelerator),
            other => Err(ParseDeviceClassError(other.to_owned())),
        }
    }
}
