//! The discovery interface every device backend implements.

use crate::capability::{Capability, CapabilityValue};
use crate::error::Result;
use crate::handle::{BackendHandle, BackendId};

/// A subsystem that physically discovers compute devices and answers
/// capability queries about them.
///
/// Implementations own the device resources. Handles they return are plain
/// identity keys and must stay stable for as long as the device is present,
/// so two successive `list_devices` calls under an unchanged configuration
/// return equal handles. Implementations must be safe to call from several
/// threads at once.
pub trait DeviceBackend: Send + Sync {
    /// Short backend name (e.g. `"opencl"`, `"system"`).
    fn name(&self) -> &str;

    /// Id stamped into every handle this backend issues.
    fn id(&self) -> BackendId;

    /// Every device currently visible, in backend order.
    ///
    /// An empty list is a valid answer; an unreachable backend is
    /// [`BackendError::Unavailable`](crate::BackendError::Unavailable).
    fn list_devices(&self) -> Result<Vec<BackendHandle>>;

    /// Answer one capability query for `handle`.
    fn query_capability(
        &self,
        handle: BackendHandle,
        capability: Capability,
    ) -> Result<CapabilityValue>;

    /// Whether `handle` was issued by this backend.
    fn owns(&self, handle: BackendHandle) -> bool {
        handle.backend() == self.id() && !handle.is_null()
    }
}
