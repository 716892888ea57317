//! Compute device discovery and classification.
//!
//! This crate provides:
//! - [`device`]: the [`Device`] value type with key-based equality and hashing
//! - [`classifier`]: mapping backend type flags to one [`DeviceClass`]
//! - [`enumerator`]: [`DeviceEnumerator`] with full and per-class enumeration
//! - [`selector`]: picking a single device by score
//! - [`config`]: [`DiscoveryConfig`] and its environment overrides
//! - [`error`]: the [`DiscoveryError`] taxonomy
//!
//! Backends live in `devdisc-backend`; probing of the real machine lives in
//! `devdisc-probe`; rate-limited warnings come from `devdisc-warn-once`.

pub mod class;
pub mod classifier;
pub mod config;
pub mod device;
pub mod enumerator;
pub mod error;
pub mod selector;

pub use class::{DeviceClass, ParseDeviceClassError};
pub use classifier::{class_from_mask, classify, classify_handle};
pub use config::DiscoveryConfig;
pub use device::Device;
pub use enumerator::{ClassifiedDevice, DeviceEnumerator};
pub use error::{DiscoveryError, Result};
pub use selector::{ClassSelector, DefaultSelector, DeviceSelector, FnSelector, select_device};

pub use devdisc_backend::{BackendHandle, DeviceBackend};
