//! Opaque handles exchanged between the bridge and the managed host.
//!
//! Three identifiers cross the boundary:
//! - `RawHandle`: a key into the host-side table mapping to an actual
//!   managed class, object, or array
//! - `InstanceId`: which independent Lira runtime instance is calling
//! - `ExecutorHandle`: the host's current call context, valid only on the
//!   thread that produced it

use std::thread::{self, ThreadId};

/// Opaque key into the managed host's handle table.
///
/// The bridge never interprets or mutates the value; it only passes it
/// back to the host. Liveness is the host's bookkeeping: a handle is
/// valid until the host releases its table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(i64);

impl RawHandle {
    /// Wrap a host-allocated handle value.
    pub fn new(raw: i64) -> Self {
        RawHandle(raw)
    }

    /// The raw table key.
    pub fn get(self) -> i64 {
        self.0
    }
}

/// Index of an independent Lira runtime instance.
///
/// The host may serve several runtime instances at once and routes handle
/// tables by this index. Set once at bridge initialization, read on every
/// dispatch, never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Wrap an instance index.
    pub fn new(index: u32) -> Self {
        InstanceId(index)
    }

    /// The raw index.
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Opaque reference to the managed host's current call context.
///
/// Thread-affine: the handle is only valid on the thread that produced
/// it, and only for the duration of a single reentry into the bridge.
/// The producing thread is recorded so that cross-thread use can be
/// detected instead of silently corrupting both heaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorHandle {
    token: u64,
    thread: ThreadId,
}

impl ExecutorHandle {
    /// Create a handle from the host's context token, bound to the
    /// calling thread.
    pub fn for_current_thread(token: u64) -> Self {
        ExecutorHandle {
            token,
            thread: thread::current().id(),
        }
    }

    /// The host's raw context token.
    pub fn token(self) -> u64 {
        self.token
    }

    /// Whether the calling thread is the one that produced this handle.
    ///
    /// A `false` here means the handle is stale: it was captured during a
    /// reentry on another thread and must not be used for any host call.
    pub fn produced_on_current_thread(self) -> bool {
        thread::current().id() == self.thread
    }
}
