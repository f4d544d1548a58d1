//! Lira bridge — proxy dispatch between the Lira script runtime and a
//! managed host runtime.
//!
//! The two runtimes have incompatible memory models: Lira has its own
//! collected value stack, the host has its own collector and a strict
//! one-thread-per-call-context rule. This crate implements the protocol
//! that spans them:
//!
//! - proxies: script values standing in for managed classes, objects,
//!   and arrays, each wrapping an opaque handle
//! - the dispatch router: member read/write, invocation, construction,
//!   and length operations routed to host entry points
//! - the call-context cell: the thread-affine executor handle, rebound
//!   at every reentry
//! - lifecycle: at-most-once handle release when the collector reclaims
//!   a proxy
//! - the binding table: one-shot resolution of every required host entry
//!   point, fail-fast on any gap
//!
//! Lookup failures and managed exceptions surface as recoverable
//! [`BridgeError`]s; broken cross-runtime invariants abort the process.

mod bindings;
mod bridge;
mod context;
mod error;
mod lifecycle;
mod router;
mod stack;

pub use bindings::BindingTable;
pub use bridge::Bridge;
pub use context::ContextCell;
pub use error::{BindingFault, BridgeError, FatalError, InitError};
pub use router::MemberKey;
pub use stack::ValueStack;

// Re-export the SDK boundary types for ease of use.
pub use lira_sdk::{
    entry, EntryArg, EntryOut, EntryPointRegistry, ExecutorHandle, InstanceId, ManagedException,
    Proxy, ProxyKind, RawHandle, ResolverContext, ResolverError, ScriptValue,
};
