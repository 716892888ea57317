//! Capability identifiers and values exchanged with device backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A capability a backend can be asked about for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Raw device-type flags, answered with [`CapabilityValue::DeviceType`].
    DeviceType,
    /// Human-readable device name.
    Name,
    /// Vendor string.
    Vendor,
    /// Number of parallel compute units.
    MaxComputeUnits,
    /// Driver version string.
    DriverVersion,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::DeviceType => write!(f, "device_type"),
            Capability::Name => write!(f, "name"),
            Capability::Vendor => write!(f, "vendor"),
            Capability::MaxComputeUnits => write!(f, "max_compute_units"),
            Capability::DriverVersion => write!(f, "driver_version"),
        }
    }
}

/// Device-type flags as reported by a backend.
///
/// Several flags may be set at once; some backend taxonomies report, say, a
/// CPU that is also the host. Picking a single class from the mask is the
/// classifier's job, not the backend's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTypeMask(u32);

impl DeviceTypeMask {
    pub const EMPTY: Self = Self(0);
    pub const HOST: Self = Self(1 << 0);
    pub const CPU: Self = Self(1 << 1);
    pub const GPU: Self = Self(1 << 2);
    pub const ACCELERATOR: Self = Self(1 << 3);
    /// Vendor-specific device outside the known taxonomy.
    pub const CUSTOM: Self = Self(1 << 4);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for DeviceTypeMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for DeviceTypeMask {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for DeviceTypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(DeviceTypeMask, &str); 5] = [
            (DeviceTypeMask::HOST, "host"),
            (DeviceTypeMask::CPU, "cpu"),
            (DeviceTypeMask::GPU, "gpu"),
            (DeviceTypeMask::ACCELERATOR, "accelerator"),
            (DeviceTypeMask::CUSTOM, "custom"),
        ];
        let names: Vec<&str> =
            NAMES.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, name)| *name).collect();
        if names.is_empty() { write!(f, "none") } else { write!(f, "{}", names.join("|")) }
    }
}

/// Answer to a capability query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CapabilityValue {
    DeviceType(DeviceTypeMask),
    Text(String),
    Count(u32),
}

impl CapabilityValue {
    pub fn as_device_type(&self) -> Option<DeviceTypeMask> {
        match self {
            CapabilityValue::DeviceType(mask) => Some(*mask),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CapabilityValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            CapabilityValue::Count(count) => Some(*count),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_contains_requires_all_bits() {
        let mask = DeviceTypeMask::CPU | DeviceTypeMask::HOST;
        assert!(mask.contains(DeviceTypeMask::CPU));
        assert!(mask.contains(DeviceTypeMask::HOST));
        assert!(mask.contains(DeviceTypeMask::CPU | DeviceTypeMask::HOST));
        assert!(!mask.contains(DeviceTypeMask::GPU));
        assert!(!mask.contains(DeviceTypeMask::EMPTY));
    }

    #[test]
    fn mask_display_lists_flags() {
        assert_eq!(DeviceTypeMask::EMPTY.to_string(), "none");
        assert_eq!((DeviceTypeMask::GPU | DeviceTypeMask::CUSTOM).to_string(), "gpu|custom");
    }

    #[test]
    fn value_accessors_are_typed() {
        let ty = CapabilityValue::DeviceType(DeviceTypeMask::GPU);
        assert_eq!(ty.as_device_type(), Some(DeviceTypeMask::GPU));
        assert_eq!(ty.as_text(), None);
        assert_eq!(CapabilityValue::Text("Arc A770".into()).as_text(), Some("Arc A770"));
        assert_eq!(CapabilityValue::Count(32).as_count(), Some(32));
        assert_eq!(CapabilityValue::Count(32).as_device_type(), None);
    }

    #[test]
    fn value_serializes_with_kind_tag() {
        let json = serde_json::to_string(&CapabilityValue::Count(4)).unwrap();
        assert_eq!(json, r#"{"kind":"count","value":4}"#);
    }
}
