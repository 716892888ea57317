//! Rate-limited warnings.
//!
//! The first warning for a key is logged at WARN; repeats drop to DEBUG. Used
//! for per-device failures that would otherwise repeat on every enumeration.
//!
//! ```
//! use devdisc_warn_once::warn_once;
//!
//! for _ in 0..3 {
//!     // WARN once, then DEBUG.
//!     warn_once!("classify:gpu0", "device {} stopped answering", "gpu0");
//! }
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

static WARNED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashSet<String>> {
    WARNED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Log `message` at WARN the first time `key` is seen, at DEBUG afterwards.
///
/// Returns `true` when the message went out at WARN level.
pub fn warn_once_fn(key: &str, message: &str) -> bool {
    // A panic while holding the lock cannot corrupt a set of strings.
    let mut seen = match registry().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if seen.insert(key.to_owned()) {
        tracing::warn!(key = %key, "{}", message);
        true
    } else {
        tracing::debug!(key = %key, "(rate-limited) {}", message);
        false
    }
}

/// Log a formatted warning once per key.
///
/// ```
/// use devdisc_warn_once::warn_once;
///
/// warn_once!("probe:clinfo", "clinfo not found; skipping {} probing", "oneAPI");
/// ```
#[macro_export]
macro_rules! warn_once {
    ($key:expr, $($arg:tt)*) => {
        $crate::warn_once_fn($key, &format!($($arg)*))
    };
}
