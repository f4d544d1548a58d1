//! The call-context cell.
//!
//! Holds the executor handle that is valid for the current reentry into
//! the bridge, together with the immutable runtime-instance index. The
//! host may enter a given runtime instance from different native threads
//! at different times (never two at once, by external discipline), so the
//! cached executor is stale the moment a new reentry begins and must be
//! rebound before any dispatch. Failure to rebind is a programming error
//! in the caller, not a recoverable condition: reads verify the stored
//! handle and abort on a stale or unbound cell.

use lira_sdk::{ExecutorHandle, InstanceId};
use parking_lot::Mutex;

use crate::error::{die, FatalError};

/// Per-bridge slot for the currently valid executor handle.
#[derive(Debug)]
pub struct ContextCell {
    instance: InstanceId,
    executor: Mutex<Option<ExecutorHandle>>,
}

impl ContextCell {
    /// Create an unbound cell for the given runtime instance.
    pub fn new(instance: InstanceId) -> Self {
        Self {
            instance,
            executor: Mutex::new(None),
        }
    }

    /// The runtime-instance index, fixed at initialization.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Overwrite the active executor handle for a new reentry.
    pub fn rebind(&self, executor: ExecutorHandle) {
        *self.executor.lock() = Some(executor);
    }

    /// The executor handle bound for the current reentry.
    ///
    /// Aborts the process if the cell is unbound or the bound handle was
    /// produced on a different thread — either means a dispatch is running
    /// outside a properly entered reentry and the cross-runtime invariant
    /// is already broken.
    pub fn current(&self) -> ExecutorHandle {
        match *self.executor.lock() {
            Some(exec) if exec.produced_on_current_thread() => exec,
            Some(_) => die(FatalError::StaleExecutor),
            None => die(FatalError::ExecutorUnbound),
        }
    }

    /// The bound executor if there is one, without the unbound abort.
    ///
    /// Used by the reclaim path, where an unbound cell means the managed
    /// side is no longer reachable and release becomes a no-op. A handle
    /// bound on another thread still aborts.
    pub fn try_current(&self) -> Option<ExecutorHandle> {
        match *self.executor.lock() {
            Some(exec) if exec.produced_on_current_thread() => Some(exec),
            Some(_) => die(FatalError::StaleExecutor),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebind_overwrites() {
        let cell = ContextCell::new(InstanceId::new(0));
        let h1 = ExecutorHandle::for_current_thread(1);
        let h2 = ExecutorHandle::for_current_thread(2);

        cell.rebind(h1);
        assert_eq!(cell.current(), h1);

        cell.rebind(h2);
        // Nothing after the rebind observes h1.
        assert_eq!(cell.current(), h2);
        assert_eq!(cell.try_current(), Some(h2));
    }

    #[test]
    fn test_unbound_cell_has_no_current() {
        let cell = ContextCell::new(InstanceId::new(3));
        assert_eq!(cell.instance(), InstanceId::new(3));
        assert_eq!(cell.try_current(), None);
    }
}
