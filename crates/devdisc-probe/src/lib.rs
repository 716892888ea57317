//! Runtime device probing for the discovery layer.
//!
//! Answers "what compute hardware does this machine have?" from compile-time
//! feature flags and cheap runtime checks, and exposes the answer as a
//! [`DeviceBackend`](devdisc_backend::DeviceBackend) through [`SystemBackend`].

mod system;

pub use system::SystemBackend;

use std::fmt;

// ── SIMD level ───────────────────────────────────────────────────────────────

/// SIMD instruction set level available at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum SimdLevel {
    /// No SIMD; scalar fallback only.
    Scalar,
    /// ARM NEON (128-bit).
    Neon,
    /// x86 SSE4.2 (128-bit).
    Sse42,
    /// x86 AVX2 (256-bit).
    Avx2,
    /// x86 AVX-512 (512-bit).
    Avx512,
}

impl fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimdLevel::Scalar => write!(f, "scalar"),
            SimdLevel::Neon => write!(f, "neon"),
            SimdLevel::Sse42 => write!(f, "sse4.2"),
            SimdLevel::Avx2 => write!(f, "avx2"),
            SimdLevel::Avx512 => write!(f, "avx512"),
        }
    }
}

/// Detect the best SIMD instruction-set level available at runtime.
///
/// Detection order: AVX-512 > AVX2 > SSE4.2 (`x86_64`); NEON (`AArch64`);
/// scalar fallback on all other targets.
#[allow(clippy::missing_const_for_fn)] // not const on x86_64 (runtime CPUID)
pub fn detect_simd_level() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512f") {
            SimdLevel::Avx512
        } else if is_x86_feature_detected!("avx2") {
            SimdLevel::Avx2
        } else if is_x86_feature_detected!("sse4.2") {
            SimdLevel::Sse42
        } else {
            SimdLevel::Scalar
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        SimdLevel::Neon
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        SimdLevel::Scalar
    }
}

// ── CPU capabilities ─────────────────────────────────────────────────────────

/// CPU capabilities detected at runtime.
///
/// Obtained by calling [`probe_cpu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// Number of logical CPU cores available to the process (always ≥ 1).
    pub core_count: usize,
    /// Best SIMD level.
    pub simd_level: SimdLevel,
    /// Vendor string from the OS, or the target architecture when unknown.
    pub vendor: String,
}

/// Probe the current CPU and return its capabilities.
///
/// # Examples
///
/// ```
/// use devdisc_probe::probe_cpu;
///
/// let caps = probe_cpu();
/// assert!(caps.core_count >= 1);
/// assert!(!caps.vendor.is_empty());
/// ```
pub fn probe_cpu() -> CpuCapabilities {
    let core_count = std::thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(1);
    CpuCapabilities { core_count, simd_level: detect_simd_level(), vendor: cpu_vendor() }
}

fn cpu_vendor() -> String {
    std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|info| {
            info.lines()
                .find(|line| line.starts_with("vendor_id") || line.starts_with("CPU implementer"))
                .and_then(|line| line.split_once(':'))
                .map(|(_, value)| value.trim().to_owned())
        })
        .filter(|vendor| !vendor.is_empty())
        .unwrap_or_else(|| std::env::consts::ARCH.to_owned())
}

// ── GPU capabilities ─────────────────────────────────────────────────────────

/// GPU runtimes detected at runtime.
///
/// `DEVDISC_GPU_FAKE` supports comma-separated backends (`cuda`, `rocm`,
/// `oneapi`, `gpu`); `DEVDISC_GPU_FAKE=none` makes all flags `false`.
/// Strict mode (`DEVDISC_STRICT_MODE=1`) ignores the override and probes real
/// hardware.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct GpuCapabilities {
    /// Any GPU runtime is available.
    pub available: bool,
    pub cuda_available: bool,
    pub rocm_available: bool,
    /// Intel oneAPI/`OpenCL` runtime.
    pub oneapi_available: bool,
}

/// NPU capabilities detected at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NpuCapabilities {
    pub available: bool,
    /// A `/dev/accel/accel*` character device appears to be present.
    pub accel_device_present: bool,
}

/// Probe GPU runtimes. Every flag is `false` when no GPU support is compiled.
pub fn probe_gpu() -> GpuCapabilities {
    let cuda_available = cuda_available_runtime();
    let rocm_available = rocm_available_runtime();
    let oneapi_available = oneapi_available_runtime();
    let available = cuda_available || rocm_available || oneapi_available;
    GpuCapabilities { available, cuda_available, rocm_available, oneapi_available }
}

/// Whether GPU probing was compiled into this binary.
#[inline]
pub const fn gpu_compiled() -> bool {
    cfg!(any(feature = "gpu", feature = "cuda", feature = "rocm", feature = "oneapi"))
}

/// Whether NPU probing was compiled into this binary.
#[inline]
pub const fn npu_compiled() -> bool {
    cfg!(feature = "npu")
}

#[cfg(any(feature = "gpu", feature = "cuda", feature = "rocm", feature = "oneapi", feature = "npu"))]
fn strict_mode_enabled() -> bool {
    std::env::var("DEVDISC_STRICT_MODE")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

#[cfg(any(feature = "gpu", feature = "cuda", feature = "rocm", feature = "oneapi"))]
fn fake_gpu_backends() -> Option<std::collections::HashSet<String>> {
    if strict_mode_enabled() {
        return None;
    }

    let fake = std::env::var("DEVDISC_GPU_FAKE").ok()?;
    let normalized = fake.trim().to_ascii_lowercase();

    if normalized == "none" {
        return Some(std::collections::HashSet::new());
    }

    Some(
        normalized
            .split([',', ';', '|', ' '])
            .filter(|part| !part.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
    )
}

#[cfg(any(feature = "gpu", feature = "cuda", feature = "rocm", feature = "oneapi"))]
fn command_ok(cmd: &str, args: &[&str]) -> bool {
    std::process::Command::new(cmd)
        .args(args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(any(feature = "gpu", feature = "cuda"))]
fn cuda_available_runtime() -> bool {
    if let Some(fake) = fake_gpu_backends() {
        return fake.contains("cuda") || fake.contains("gpu");
    }
    command_ok("nvidia-smi", &[])
}

#[cfg(not(any(feature = "gpu", feature = "cuda")))]
#[inline]
const fn cuda_available_runtime() -> bool {
    false
}

#[cfg(any(feature = "gpu", feature = "rocm"))]
fn rocm_available_runtime() -> bool {
    if let Some(fake) = fake_gpu_backends() {
        return fake.contains("rocm") || fake.contains("gpu");
    }
    command_ok("rocm-smi", &["--showid"])
}

#[cfg(not(any(feature = "gpu", feature = "rocm")))]
#[inline]
const fn rocm_available_runtime() -> bool {
    false
}

/// Detection order: `DEVDISC_GPU_FAKE`, then `clinfo` reporting an Intel GPU,
/// then a successful `sycl-ls`.
#[cfg(feature = "oneapi")]
fn oneapi_available_runtime() -> bool {
    if let Some(fake) = fake_gpu_backends() {
        return fake.contains("oneapi") || fake.contains("gpu");
    }
    clinfo_has_intel_gpu() || command_ok("sycl-ls", &[])
}

#[cfg(not(feature = "oneapi"))]
#[inline]
const fn oneapi_available_runtime() -> bool {
    false
}

#[cfg(feature = "oneapi")]
fn clinfo_has_intel_gpu() -> bool {
    std::process::Command::new("clinfo")
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .output()
        .map(|output| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            stdout.contains("Intel")
                && (stdout.contains("GPU") || stdout.contains("Arc") || stdout.contains("Graphics"))
        })
        .unwrap_or(false)
}

/// Probe Intel NPU availability.
///
/// `DEVDISC_NPU_FAKE=1|0` overrides detection unless strict mode is on.
#[cfg(feature = "npu")]
pub fn probe_npu() -> NpuCapabilities {
    if !strict_mode_enabled() {
        if let Ok(fake) = std::env::var("DEVDISC_NPU_FAKE") {
            let present = fake == "1" || fake.eq_ignore_ascii_case("true");
            return NpuCapabilities { available: present, accel_device_present: present };
        }
    }
    let accel_device_present = accel_device_exists();
    NpuCapabilities { available: accel_device_present, accel_device_present }
}

/// Probe Intel NPU availability; always `false` when NPU support is not compiled.
#[cfg(not(feature = "npu"))]
pub const fn probe_npu() -> NpuCapabilities {
    NpuCapabilities { available: false, accel_device_present: false }
}

#[cfg(feature = "npu")]
fn accel_device_exists() -> bool {
    std::fs::read_dir("/dev/accel")
        .map(|entries| {
            entries.flatten().any(|entry| entry.file_name().to_string_lossy().starts_with("accel"))
        })
        .unwrap_or(false)
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// One consistent view of the machine's compute hardware.
///
/// [`SystemBackend`] keeps a snapshot so that repeated enumeration does not
/// re-run external commands and stays stable between rescans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSnapshot {
    pub cpu: CpuCapabilities,
    pub gpu: GpuCapabilities,
    pub npu: NpuCapabilities,
}

impl ProbeSnapshot {
    /// Probe everything now.
    pub fn detect() -> Self {
        Self { cpu: probe_cpu(), gpu: probe_gpu(), npu: probe_npu() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_not_available_without_feature() {
        #[cfg(not(any(feature = "gpu", feature = "cuda", feature = "rocm", feature = "oneapi")))]
        assert_eq!(probe_gpu(), GpuCapabilities::default());
    }

    #[test]
    fn simd_level_is_deterministic() {
        assert_eq!(detect_simd_level(), detect_simd_level());
    }

    #[test]
    fn cpu_vendor_never_empty() {
        assert!(!cpu_vendor().is_empty());
    }

    #[test]
    fn npu_compiled_reflects_feature_flag() {
        assert_eq!(npu_compiled(), cfg!(feature = "npu"));
    }

    #[cfg(any(feature = "gpu", feature = "cuda"))]
    #[test]
    #[serial_test::serial(devdisc_env)]
    fn gpu_fake_env_overrides_detection() {
        temp_env::with_var("DEVDISC_STRICT_MODE", None::<&str>, || {
            temp_env::with_var("DEVDISC_GPU_FAKE", Some("cuda"), || {
                assert!(probe_gpu().cuda_available);
            });
            temp_env::with_var("DEVDISC_GPU_FAKE", Some("none"), || {
                assert!(!probe_gpu().available);
            });
        });
    }

    #[cfg(feature = "npu")]
    #[test]
    #[serial_test::serial(devdisc_env)]
    fn npu_fake_env_overrides_detection() {
        temp_env::with_var("DEVDISC_STRICT_MODE", None::<&str>, || {
            temp_env::with_var("DEVDISC_NPU_FAKE", Some("1"), || {
                assert!(probe_npu().available);
            });
            temp_env::with_var("DEVDISC_NPU_FAKE", Some("0"), || {
                assert!(!probe_npu().available);
            });
        });
    }
}
