//! Resolver entry points — the interface a managed host must export.
//!
//! The host registers its reflection operations in an
//! [`EntryPointRegistry`] by stable name and signature. The bridge links
//! the registry into its binding table exactly once at initialization and
//! dispatches every proxy operation through the linked entry points.
//!
//! Entry points are uniform callables: they receive a [`ResolverContext`]
//! (instance id, executor handle, the argument window on the value stack,
//! and push operations for results) plus a small argument list, and return
//! an [`EntryOut`] or a [`ResolverError`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ResolverError;
use crate::handle::{ExecutorHandle, InstanceId, RawHandle};
use crate::value::{Proxy, ProxyKind, ScriptValue};

// ============================================================================
// Resolver Context
// ============================================================================

/// What an entry point sees of the calling bridge.
///
/// The bridge provides the concrete implementation; resolver code only
/// programs against this trait and never touches bridge internals.
///
/// The argument window is the top slice of the value stack the caller
/// prepared for the operation: the call arguments for an invocation, or
/// the single value to assign for a write. Results are pushed above the
/// window; the entry point reports how many values it pushed.
pub trait ResolverContext {
    /// Which runtime instance is dispatching.
    fn instance(&self) -> InstanceId;

    /// The executor handle bound for the current reentry.
    fn executor(&self) -> ExecutorHandle;

    /// Number of values in the argument window.
    fn arg_count(&self) -> usize;

    /// Read a value from the argument window, `0` being the first
    /// argument. `None` if `index` is outside the window.
    fn arg(&self, index: usize) -> Option<&ScriptValue>;

    /// Push a result value onto the stack.
    fn push(&mut self, value: ScriptValue);

    /// Push a class proxy for `handle`, registering its release token.
    fn push_class_proxy(&mut self, handle: RawHandle) {
        self.push(ScriptValue::Proxy(Proxy::new(ProxyKind::Class, handle)));
    }

    /// Push an object proxy for `handle`, registering its release token.
    fn push_object_proxy(&mut self, handle: RawHandle) {
        self.push(ScriptValue::Proxy(Proxy::new(ProxyKind::Object, handle)));
    }

    /// Push an array proxy for `handle`, registering its release token.
    fn push_array_proxy(&mut self, handle: RawHandle) {
        self.push(ScriptValue::Proxy(Proxy::new(ProxyKind::Array, handle)));
    }
}

// ============================================================================
// Entry point calling convention
// ============================================================================

/// An argument passed to an entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryArg<'a> {
    /// A handle into the host's table (class, object, or array).
    Handle(RawHandle),
    /// A member or class name.
    Name(&'a str),
    /// An array element index.
    Index(usize),
    /// Count of call arguments in the context's argument window.
    Count(usize),
}

impl<'a> EntryArg<'a> {
    /// Get the handle if this argument is one.
    pub fn as_handle(&self) -> Option<RawHandle> {
        match self {
            EntryArg::Handle(h) => Some(*h),
            _ => None,
        }
    }

    /// Get the name if this argument is one.
    pub fn as_name(&self) -> Option<&'a str> {
        match self {
            EntryArg::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Get the index if this argument is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            EntryArg::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the argument count if this argument is one.
    pub fn as_count(&self) -> Option<usize> {
        match self {
            EntryArg::Count(c) => Some(*c),
            _ => None,
        }
    }
}

/// Successful result of an entry point.
///
/// The variant must match the entry point's declared signature; the
/// bridge treats a wrong shape as a broken cross-runtime invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOut {
    /// `count` values were pushed above the argument window.
    Pushed(usize),
    /// A handle was produced, nothing pushed (class resolution).
    Handle(RawHandle),
    /// An element count was produced, nothing pushed (array length).
    Length(usize),
    /// Nothing produced, nothing pushed (handle release).
    Done,
}

/// Result type for entry point calls.
pub type EntryResult = Result<EntryOut, ResolverError>;

/// Uniform entry point callable.
///
/// `Arc`'d so the linked binding table can share host-owned closures.
pub type EntryPointFn =
    Arc<dyn Fn(&mut dyn ResolverContext, &[EntryArg<'_>]) -> EntryResult + Send + Sync>;

// ============================================================================
// Entry point names and signatures
// ============================================================================

/// Stable name and signature of one required entry point.
///
/// Signatures use a compact shape notation checked at link time:
/// `h` handle, `s` name, `i` index, `c` argument count; `->n` pushed
/// count, `->h` handle, `->len` length, `->()` nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPointSpec {
    /// Stable entry point name.
    pub name: &'static str,
    /// Expected signature shape.
    pub signature: &'static str,
}

/// Entry point names and signatures the bridge links at initialization.
pub mod entry {
    use super::EntryPointSpec;

    /// Fully-qualified class name to class handle.
    pub const RESOLVE_CLASS: EntryPointSpec = EntryPointSpec {
        name: "resolveClassByName",
        signature: "(s)->h",
    };
    /// Static field or nested class lookup by name.
    pub const CLASS_READ: EntryPointSpec = EntryPointSpec {
        name: "readClassMember",
        signature: "(h,s)->n",
    };
    /// Static field assignment; the value is the argument window.
    pub const CLASS_WRITE: EntryPointSpec = EntryPointSpec {
        name: "writeClassMember",
        signature: "(h,s)->n",
    };
    /// Static method call; overload selection is the host's policy.
    pub const CLASS_INVOKE: EntryPointSpec = EntryPointSpec {
        name: "invokeClassMember",
        signature: "(h,s,c)->n",
    };
    /// Constructor call on a class handle.
    pub const CLASS_CONSTRUCT: EntryPointSpec = EntryPointSpec {
        name: "constructClass",
        signature: "(h,c)->n",
    };
    /// Instance field or bound-method lookup by name.
    pub const OBJECT_READ: EntryPointSpec = EntryPointSpec {
        name: "readObjectMember",
        signature: "(h,s)->n",
    };
    /// Instance field assignment; the value is the argument window.
    pub const OBJECT_WRITE: EntryPointSpec = EntryPointSpec {
        name: "writeObjectMember",
        signature: "(h,s)->n",
    };
    /// Instance method call; overload selection is the host's policy.
    pub const OBJECT_INVOKE: EntryPointSpec = EntryPointSpec {
        name: "invokeObjectMember",
        signature: "(h,s,c)->n",
    };
    /// Element count of an array handle.
    pub const ARRAY_LENGTH: EntryPointSpec = EntryPointSpec {
        name: "arrayLength",
        signature: "(h)->len",
    };
    /// Indexed element read.
    pub const ARRAY_READ: EntryPointSpec = EntryPointSpec {
        name: "readArrayElement",
        signature: "(h,i)->n",
    };
    /// Indexed element write; the value is the argument window.
    pub const ARRAY_WRITE: EntryPointSpec = EntryPointSpec {
        name: "writeArrayElement",
        signature: "(h,i)->n",
    };
    /// Idempotent handle release.
    pub const RELEASE: EntryPointSpec = EntryPointSpec {
        name: "releaseHandle",
        signature: "(h)->()",
    };

    /// Every entry point a conforming host must export. The bridge's
    /// binding table is linked in exactly this order.
    pub const REQUIRED: [EntryPointSpec; 12] = [
        RESOLVE_CLASS,
        CLASS_READ,
        CLASS_WRITE,
        CLASS_INVOKE,
        CLASS_CONSTRUCT,
        OBJECT_READ,
        OBJECT_WRITE,
        OBJECT_INVOKE,
        ARRAY_LENGTH,
        ARRAY_READ,
        ARRAY_WRITE,
        RELEASE,
    ];
}

// ============================================================================
// Entry point registry
// ============================================================================

/// One registered entry point: its declared signature and callable.
#[derive(Clone)]
pub struct RegisteredEntry {
    signature: String,
    func: EntryPointFn,
}

impl RegisteredEntry {
    /// The signature the host declared at registration.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The callable.
    pub fn func(&self) -> EntryPointFn {
        Arc::clone(&self.func)
    }
}

/// Registry of host entry points indexed by stable name.
///
/// Populated by the host before bridge initialization; the bridge links
/// it once and never consults it again.
#[derive(Default)]
pub struct EntryPointRegistry {
    entries: HashMap<String, RegisteredEntry>,
}

impl EntryPointRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register an entry point by name and signature.
    pub fn register(
        &mut self,
        name: &str,
        signature: &str,
        func: impl Fn(&mut dyn ResolverContext, &[EntryArg<'_>]) -> EntryResult
            + Send
            + Sync
            + 'static,
    ) {
        self.entries.insert(
            name.to_string(),
            RegisteredEntry {
                signature: signature.to_string(),
                func: Arc::new(func),
            },
        );
    }

    /// Look up an entry point by name (used at link time).
    pub fn get(&self, name: &str) -> Option<&RegisteredEntry> {
        self.entries.get(name)
    }

    /// Check if an entry point is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered entry points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
