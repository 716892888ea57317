//! Property tests for device identity and filtered enumeration.
//!
//! Backends are generated with random device-type masks; the properties must
//! hold for every generated configuration.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use devdisc_backend::{DeviceBackend, DeviceTypeMask, SimulatedBackend};
use devdisc_core::{
    Device, DeviceClass, DeviceEnumerator, DiscoveryConfig, class_from_mask,
};
use proptest::prelude::*;

fn hash_of(device: &Device) -> u64 {
    let mut hasher = DefaultHasher::new();
    device.hash(&mut hasher);
    hasher.finish()
}

fn backend_from(masks: &[u32]) -> Arc<SimulatedBackend> {
    let mut builder = SimulatedBackend::builder("prop");
    for (index, bits) in masks.iter().enumerate() {
        builder = builder.device(index as u64 + 1, DeviceTypeMask::from_bits(*bits));
    }
    Arc::new(builder.build())
}

fn enumerator(backend: &Arc<SimulatedBackend>, expose_host: bool) -> DeviceEnumerator {
    DeviceEnumerator::new(DiscoveryConfig::default().with_expose_host_device(expose_host))
        .with_backend(backend.clone())
}

proptest! {
    #[test]
    fn equal_devices_hash_equally(masks in prop::collection::vec(0u32..32, 1..8), pick in 0usize..8) {
        let backend = backend_from(&masks);
        let raw = (pick % masks.len()) as u64 + 1;
        let a = Device::from_backend(backend.handle(raw), backend.clone());
        let b = Device::from_backend(backend.handle(raw), backend.clone());
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }
}

proptest! {
    #[test]
    fn copies_keep_equality_and_class(masks in prop::collection::vec(0u32..32, 1..8)) {
        let backend = backend_from(&masks);
        for device in enumerator(&backend, true).enumerate_all().unwrap() {
            let copy = device.clone();
            prop_assert_eq!(&device, &copy);
            prop_assert_eq!(device.class_of().unwrap(), copy.class_of().unwrap());
        }
    }
}

proptest! {
    #[test]
    fn take_transfers_identity(masks in prop::collection::vec(0u32..32, 1..8)) {
        let backend = backend_from(&masks);
        for mut device in enumerator(&backend, false).enumerate_all().unwrap() {
            let before = device.clone();
            let moved = device.take();
            prop_assert_eq!(&moved, &before);
            prop_assert_eq!(&device, &Device::default());
            prop_assert!(device.class_of().is_ok());
        }
    }
}

proptest! {
    #[test]
    fn by_class_partitions_enumerate_all(
        masks in prop::collection::vec(0u32..32, 0..10),
        expose_host in any::<bool>(),
    ) {
        let backend = backend_from(&masks);
        let enumerator = enumerator(&backend, expose_host);
        let all = enumerator.enumerate_all().unwrap();

        let mut union = Vec::new();
        for class in DeviceClass::ALL {
            let filtered = enumerator.enumerate_by_class(class).unwrap();
            for device in &filtered {
                prop_assert_eq!(device.class_of().unwrap(), class);
            }
            let expected: Vec<Device> =
                all.iter().filter(|d| d.class_of().unwrap() == class).cloned().collect();
            prop_assert_eq!(&filtered, &expected);
            union.extend(filtered);
        }
        prop_assert_eq!(union.len(), all.len());
        let distinct: HashSet<Device> = union.into_iter().collect();
        prop_assert_eq!(distinct.len(), all.len());
    }
}

proptest! {
    #[test]
    fn at_most_one_host(masks in prop::collection::vec(0u32..32, 0..10), expose_host in any::<bool>()) {
        let backend = backend_from(&masks);
        let hosts = enumerator(&backend, expose_host).enumerate_by_class(DeviceClass::Host).unwrap();
        let reported = masks.iter().any(|bits| DeviceTypeMask::from_bits(*bits).contains(DeviceTypeMask::HOST));
        prop_assert!(hosts.len() <= 1);
        prop_assert_eq!(hosts.len() == 1, reported || expose_host);
        if !reported {
            prop_assert!(hosts.iter().all(Device::is_builtin_host));
        }
    }
}

proptest! {
    #[test]
    fn default_config_adds_nothing(masks in prop::collection::vec(0u32..32, 0..10)) {
        let backend = backend_from(&masks);
        let all = DeviceEnumerator::new(DiscoveryConfig::default())
            .with_backend(backend.clone())
            .enumerate_all()
            .unwrap();
        prop_assert!(all.len() <= masks.len());
        prop_assert!(all.iter().all(|d| backend.owns(d.key())));
    }
}

proptest! {
    #[test]
    fn reenumeration_yields_same_key_set(masks in prop::collection::vec(0u32..32, 0..10)) {
        let backend = backend_from(&masks);
        let enumerator = enumerator(&backend, true);
        let first: HashSet<_> = enumerator.enumerate_all().unwrap().iter().map(Device::key).collect();
        let second: HashSet<_> = enumerator.enumerate_all().unwrap().iter().map(Device::key).collect();
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #[test]
    fn classification_is_total_and_stable(bits in any::<u32>()) {
        let mask = DeviceTypeMask::from_bits(bits);
        prop_assert_eq!(class_from_mask(mask), class_from_mask(mask));
        if mask.contains(DeviceTypeMask::HOST) {
            prop_assert_eq!(class_from_mask(mask), DeviceClass::Host);
        }
    }
}
