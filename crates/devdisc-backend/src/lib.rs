//! Backend boundary for compute device discovery.
//!
//! This crate provides:
//! - [`handle`]: opaque identity keys ([`BackendHandle`]) stamped with the
//!   issuing [`BackendId`]
//! - [`capability`]: capability ids and the values backends answer with
//! - [`backend`]: the [`DeviceBackend`] trait every discovery subsystem implements
//! - [`simulated`]: a scripted in-memory backend for tests and demos
//! - [`error`]: structured backend errors

pub mod backend;
pub mod capability;
pub mod error;
pub mod handle;
pub mod simulated;

pub use backend::DeviceBackend;
pub use capability::{Capability, CapabilityValue, DeviceTypeMask};
pub use error::{BackendError, Result};
pub use handle::{BackendHandle, BackendId};
pub use simulated::{SimulatedBackend, SimulatedBackendBuilder};
