//! Tests for `devdisc-probe` against the real machine.
//!
//! These only assert invariants that hold on every supported platform, plus
//! environment-driven overrides where the matching feature is compiled.

use devdisc_backend::{Capability, DeviceBackend, DeviceTypeMask};
use devdisc_probe::{
    ProbeSnapshot, SystemBackend, detect_simd_level, gpu_compiled, probe_cpu, probe_gpu,
};
use proptest::prelude::*;
use serial_test::serial;

#[test]
fn detect_never_panics_and_always_has_host_and_cpu() {
    let backend = SystemBackend::detect();
    let handles = backend.list_devices().unwrap();
    assert!(handles.len() >= 2);

    let masks: Vec<DeviceTypeMask> = handles
        .iter()
        .map(|h| {
            backend.query_capability(*h, Capability::DeviceType).unwrap().as_device_type().unwrap()
        })
        .collect();
    assert_eq!(masks.iter().filter(|m| m.contains(DeviceTypeMask::HOST)).count(), 1);
    assert!(masks.iter().any(|m| m.contains(DeviceTypeMask::CPU)));
}

#[test]
fn relisting_is_idempotent_between_rescans() {
    let backend = SystemBackend::detect();
    assert_eq!(backend.list_devices().unwrap(), backend.list_devices().unwrap());
}

#[test]
fn cpu_probe_cores_positive() {
    assert!(probe_cpu().core_count >= 1);
}

#[test]
fn gpu_flags_imply_available() {
    let caps = probe_gpu();
    if caps.cuda_available || caps.rocm_available || caps.oneapi_available {
        assert!(caps.available);
    }
    if !gpu_compiled() {
        assert!(!caps.available);
    }
}

#[test]
#[serial(devdisc_env)]
fn strict_mode_snapshot_is_stable() {
    temp_env::with_var("DEVDISC_STRICT_MODE", Some("1"), || {
        assert_eq!(ProbeSnapshot::detect().cpu, ProbeSnapshot::detect().cpu);
    });
}

#[cfg(any(feature = "gpu", feature = "cuda"))]
#[test]
#[serial(devdisc_env)]
fn fake_cuda_shows_up_as_gpu_device() {
    temp_env::with_vars(
        [("DEVDISC_STRICT_MODE", None::<&str>), ("DEVDISC_GPU_FAKE", Some("cuda"))],
        || {
            let backend = SystemBackend::detect();
            let gpus = backend
                .list_devices()
                .unwrap()
                .into_iter()
                .filter(|h| {
                    backend
                        .query_capability(*h, Capability::DeviceType)
                        .ok()
                        .and_then(|v| v.as_device_type())
                        == Some(DeviceTypeMask::GPU)
                })
                .count();
            assert!(gpus >= 1);
        },
    );
}

proptest! {
    #[test]
    fn simd_level_consistent_across_calls(_dummy in 0u8..8) {
        prop_assert_eq!(detect_simd_level(), detect_simd_level());
    }
}
