//! Device enumeration across one or more backends.

use std::collections::HashSet;
use std::sync::Arc;

use devdisc_backend::{BackendHandle, DeviceBackend};
use devdisc_probe::SystemBackend;
use tracing::{debug, warn};

use crate::class::DeviceClass;
use crate::config::DiscoveryConfig;
use crate::device::Device;
use crate::error::{DiscoveryError, Result};
use crate::selector::{DeviceSelector, select_device};

/// A device together with the classifier's verdict at enumeration time.
///
/// `class` is `None` when the backend could not answer the class query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedDevice {
    pub device: Device,
    pub class: Option<DeviceClass>,
}

/// Produces the set of discoverable devices.
///
/// Backends are visited in registration order and each keeps its own device
/// order. Every call re-queries the backends; nothing is cached here.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use devdisc_backend::{DeviceTypeMask, SimulatedBackend};
/// use devdisc_core::{DeviceClass, DeviceEnumerator, DiscoveryConfig};
///
/// let backend = SimulatedBackend::builder("sim")
///     .device(1, DeviceTypeMask::HOST)
///     .device(2, DeviceTypeMask::CPU)
///     .device(3, DeviceTypeMask::GPU)
///     .build();
/// let enumerator = DeviceEnumerator::new(DiscoveryConfig::default()).with_backend(Arc::new(backend));
///
/// assert_eq!(enumerator.enumerate_all()?.len(), 3);
/// assert_eq!(enumerator.enumerate_by_class(DeviceClass::Gpu)?.len(), 1);
/// # Ok::<(), devdisc_core::DiscoveryError>(())
/// ```
pub struct DeviceEnumerator {
    backends: Vec<Arc<dyn DeviceBackend>>,
    config: DiscoveryConfig,
}

impl DeviceEnumerator {
    /// An enumerator with no backends.
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { backends: Vec::new(), config }
    }

    /// Probe the machine and read the configuration from the environment.
    pub fn from_env() -> Self {
        Self::new(DiscoveryConfig::from_env()).with_backend(Arc::new(SystemBackend::detect()))
    }

    pub fn with_backend(mut self, backend: Arc<dyn DeviceBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn register(&mut self, backend: Arc<dyn DeviceBackend>) {
        debug!(backend = %backend.name(), id = %backend.id(), "registering discovery backend");
        self.backends.push(backend);
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Every visible device with its class.
    ///
    /// At most one Host-class device is returned; when no backend reports
    /// one and `expose_host_device` is set, the built-in host is appended.
    /// Backends may report the built-in host key itself, which enumerates as
    /// [`Device::host`].
    /// Devices the backend cannot classify are kept with `class: None`
    /// unless a visibility filter is configured.
    pub fn enumerate_classified(&self) -> Result<Vec<ClassifiedDevice>> {
        let listed = self.list_backends()?;

        let mut seen: HashSet<BackendHandle> = HashSet::new();
        let mut host_seen = false;
        let mut devices = Vec::new();

        for (backend, handles) in listed {
            for handle in handles {
                if handle.is_null() || !(handle.is_builtin_host() || backend.owns(handle)) {
                    warn!(backend = %backend.name(), %handle, "backend reported an invalid handle; skipping");
                    continue;
                }
                if !seen.insert(handle) {
                    debug!(backend = %backend.name(), %handle, "duplicate handle ignored");
                    continue;
                }

                let device = Device::from_backend(handle, Arc::clone(backend));
                let class = match device.class_of() {
                    Ok(class) => Some(class),
                    Err(err) => {
                        devdisc_warn_once::warn_once!(
                            &format!("classify:{handle}"),
                            "device {handle} on backend '{}': {err}",
                            backend.name()
                        );
                        None
                    }
                };

                if class == Some(DeviceClass::Host) {
                    if host_seen {
                        warn!(backend = %backend.name(), %handle, "additional host device dropped");
                        continue;
                    }
                    host_seen = true;
                }
                devices.push(ClassifiedDevice { device, class });
            }
        }

        if !host_seen && self.config.expose_host_device {
            devices.push(ClassifiedDevice { device: Device::host(), class: Some(DeviceClass::Host) });
        }

        if self.config.visible_classes.is_some() {
            devices.retain(|d| d.class.is_some_and(|class| self.config.is_visible(class)));
        }

        debug!(devices = devices.len(), "enumeration complete");
        Ok(devices)
    }

    /// Every visible device, in backend order.
    pub fn enumerate_all(&self) -> Result<Vec<Device>> {
        Ok(self.enumerate_classified()?.into_iter().map(|d| d.device).collect())
    }

    /// Devices whose class is `class`, in the same relative order as
    /// [`enumerate_all`](Self::enumerate_all).
    pub fn enumerate_by_class(&self, class: DeviceClass) -> Result<Vec<Device>> {
        Ok(self
            .enumerate_classified()?
            .into_iter()
            .filter(|d| d.class == Some(class))
            .map(|d| d.device)
            .collect())
    }

    /// The host device, if one is visible.
    pub fn host_device(&self) -> Result<Option<Device>> {
        Ok(self.enumerate_by_class(DeviceClass::Host)?.into_iter().next())
    }

    /// Enumerate and pick the best device according to `selector`.
    pub fn select(&self, selector: &dyn DeviceSelector) -> Result<Device> {
        select_device(&self.enumerate_all()?, selector)
    }

    fn list_backends(&self) -> Result<Vec<(&Arc<dyn DeviceBackend>, Vec<BackendHandle>)>> {
        let mut listed = Vec::with_capacity(self.backends.len());
        let mut failures = Vec::new();

        for backend in &self.backends {
            match backend.list_devices() {
                Ok(handles) => {
                    debug!(backend = %backend.name(), devices = handles.len(), "backend listed devices");
                    listed.push((backend, handles));
                }
                Err(err) => {
                    let error = DiscoveryError::unavailable(&err, backend.name());
                    if !self.config.tolerate_unavailable_backends {
                        return Err(error);
                    }
                    warn!(backend = %backend.name(), error = %err, "skipping unavailable backend");
                    failures.push(error);
                }
            }
        }

        if listed.is_empty() {
            if let Some(first) = failures.into_iter().next() {
                return Err(first);
            }
        }
        Ok(listed)
    }
}

impl std::fmt::Debug for DeviceEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEnumerator")
            .field("backends", &self.backend_names())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devdisc_backend::{DeviceTypeMask, SimulatedBackend};

    #[test]
    fn no_backends_is_empty() {
        assert!(DeviceEnumerator::new(DiscoveryConfig::default()).enumerate_all().unwrap().is_empty());
    }

    #[test]
    fn no_backends_with_host_exposure_yields_only_builtin_host() {
        let config = DiscoveryConfig::default().with_expose_host_device(true);
        let devices = DeviceEnumerator::new(config).enumerate_all().unwrap();
        assert_eq!(devices, vec![Device::host()]);
    }

    #[test]
    fn reported_builtin_host_key_enumerates_as_default_device() {
        struct HostOnly(devdisc_backend::BackendId);

        impl DeviceBackend for HostOnly {
            fn name(&self) -> &str {
                "host-only"
            }

            fn id(&self) -> devdisc_backend::BackendId {
                self.0
            }

            fn list_devices(&self) -> devdisc_backend::Result<Vec<BackendHandle>> {
                Ok(vec![BackendHandle::host()])
            }

            fn query_capability(
                &self,
                handle: BackendHandle,
                _capability: devdisc_backend::Capability,
            ) -> devdisc_backend::Result<devdisc_backend::CapabilityValue> {
                Err(devdisc_backend::BackendError::InvalidHandle { handle })
            }
        }

        let backend = Arc::new(HostOnly(devdisc_backend::BackendId::next()));
        let config = DiscoveryConfig::default().with_expose_host_device(true);
        let enumerator = DeviceEnumerator::new(config).with_backend(backend);
        let classified = enumerator.enumerate_classified().unwrap();
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].device, Device::default());
        assert_eq!(classified[0].class, Some(DeviceClass::Host));
    }

    #[test]
    fn reported_host_suppresses_builtin_host() {
        let backend = Arc::new(SimulatedBackend::builder("sim").device(1, DeviceTypeMask::HOST).build());
        let config = DiscoveryConfig::default().with_expose_host_device(true);
        let enumerator = DeviceEnumerator::new(config).with_backend(backend.clone());
        let hosts = enumerator.enumerate_by_class(DeviceClass::Host).unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].key(), backend.handle(1));
    }

    #[test]
    fn debug_lists_backend_names() {
        let backend = Arc::new(SimulatedBackend::builder("opencl-sim").build());
        let enumerator = DeviceEnumerator::new(DiscoveryConfig::default()).with_backend(backend);
        assert!(format!("{enumerator:?}").contains("opencl-sim"));
    }
}
