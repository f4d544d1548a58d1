//! Lira SDK — boundary types for hosting the Lira runtime.
//!
//! This crate provides the minimal types a managed host's resolver
//! implementation needs in order to serve proxy dispatches from the Lira
//! bridge, without depending on the bridge itself:
//!
//! - opaque handles ([`RawHandle`], [`InstanceId`], [`ExecutorHandle`])
//! - script values and proxies ([`ScriptValue`], [`Proxy`])
//! - the entry point calling convention ([`ResolverContext`],
//!   [`EntryPointRegistry`])
//!
//! # Example
//!
//! ```ignore
//! use lira_sdk::{entry, EntryOut, EntryPointRegistry};
//!
//! let mut registry = EntryPointRegistry::new();
//! registry.register(entry::RELEASE.name, entry::RELEASE.signature, |_cx, args| {
//!     // free the host table slot for args[0]
//!     Ok(EntryOut::Done)
//! });
//! ```

#![warn(missing_docs)]

mod error;
mod handle;
mod resolver;
mod value;

pub use error::{ManagedException, ResolverError};
pub use handle::{ExecutorHandle, InstanceId, RawHandle};
pub use resolver::{
    entry, EntryArg, EntryOut, EntryPointFn, EntryPointRegistry, EntryPointSpec, EntryResult,
    RegisteredEntry, ResolverContext,
};
pub use value::{Proxy, ProxyKind, ReleaseToken, ScriptValue};
