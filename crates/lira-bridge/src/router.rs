//! Dispatch core: routing proxy operations to host entry points.
//!
//! Every routed operation follows the same discipline: read the executor
//! handle from the call-context cell (verifying thread affinity), record
//! the stack height, call exactly one entry point, and on failure
//! truncate the stack back to the recorded height before surfacing a
//! script-level error. An entry point whose pushed-value claim disagrees
//! with the actual stack growth has broken the protocol and the process
//! aborts.

use lira_sdk::{
    EntryArg, EntryOut, ExecutorHandle, InstanceId, RawHandle, ResolverContext, ScriptValue,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bindings::{BindingTable, EntrySlot};
use crate::context::ContextCell;
use crate::error::{die, BridgeError, FatalError};
use crate::stack::ValueStack;

/// Key of a member operation: a name for classes and objects, an element
/// index for arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKey<'a> {
    /// Member name (field, method, nested class).
    Name(&'a str),
    /// Array element index.
    Index(usize),
}

/// Concrete [`ResolverContext`] handed to entry points for one dispatch.
///
/// The argument window is the top `window` values of the stack at
/// dispatch entry; pushes land above it.
struct DispatchCx<'a> {
    stack: &'a mut ValueStack,
    instance: InstanceId,
    executor: ExecutorHandle,
    window_base: usize,
    window: usize,
}

impl ResolverContext for DispatchCx<'_> {
    fn instance(&self) -> InstanceId {
        self.instance
    }

    fn executor(&self) -> ExecutorHandle {
        self.executor
    }

    fn arg_count(&self) -> usize {
        self.window
    }

    fn arg(&self, index: usize) -> Option<&ScriptValue> {
        if index < self.window {
            self.stack.get(self.window_base + index)
        } else {
            None
        }
    }

    fn push(&mut self, value: ScriptValue) {
        self.stack.push(value);
    }
}

/// Route one operation to a linked entry point.
///
/// `window` is how many already-pushed values on top of the stack belong
/// to this operation (call arguments or the value of a write). On `Err`
/// the stack has been truncated back to its height at entry.
pub(crate) fn dispatch(
    bindings: &BindingTable,
    cell: &ContextCell,
    stack: &mut ValueStack,
    slot: EntrySlot,
    args: &[EntryArg<'_>],
    window: usize,
) -> Result<EntryOut, BridgeError> {
    let executor = cell.current();
    let base = stack.len();
    if base < window {
        die(FatalError::StackUnderflow {
            needed: window,
            have: base,
        });
    }

    let binding = bindings.get(slot);
    tracing::debug!(
        entry = binding.name(),
        instance = cell.instance().get(),
        window,
        "dispatching to managed host"
    );

    let result = {
        let mut cx = DispatchCx {
            stack,
            instance: cell.instance(),
            executor,
            window_base: base - window,
            window,
        };
        binding.call(&mut cx, args)
    };

    match result {
        Ok(out) => Ok(out),
        Err(err) => {
            stack.truncate(base);
            Err(err.into())
        }
    }
}

/// Check a `Pushed` result against the observed stack growth.
///
/// `base` is the stack height at dispatch entry (window included).
pub(crate) fn expect_pushed(
    out: EntryOut,
    name: &'static str,
    stack: &ValueStack,
    base: usize,
) -> usize {
    match out {
        EntryOut::Pushed(claimed) => {
            let actual = stack.len().saturating_sub(base);
            if actual != claimed {
                die(FatalError::PushCountMismatch {
                    name,
                    claimed,
                    actual,
                });
            }
            claimed
        }
        _ => die(FatalError::WrongReturnShape { name }),
    }
}

/// Check a result that must produce a handle and push nothing.
pub(crate) fn expect_handle(
    out: EntryOut,
    name: &'static str,
    stack: &ValueStack,
    base: usize,
) -> RawHandle {
    match out {
        EntryOut::Handle(handle) if stack.len() == base => handle,
        EntryOut::Handle(_) => die(FatalError::PushCountMismatch {
            name,
            claimed: 0,
            actual: stack.len().saturating_sub(base),
        }),
        _ => die(FatalError::WrongReturnShape { name }),
    }
}

/// Check a result that must produce a length and push nothing.
pub(crate) fn expect_length(
    out: EntryOut,
    name: &'static str,
    stack: &ValueStack,
    base: usize,
) -> usize {
    match out {
        EntryOut::Length(len) if stack.len() == base => len,
        EntryOut::Length(_) => die(FatalError::PushCountMismatch {
            name,
            claimed: 0,
            actual: stack.len().saturating_sub(base),
        }),
        _ => die(FatalError::WrongReturnShape { name }),
    }
}

/// The proxy's live handle, aborting on use after release.
pub(crate) fn live_handle(proxy: &lira_sdk::Proxy) -> RawHandle {
    match proxy.handle() {
        Some(handle) => handle,
        None => die(FatalError::UseAfterRelease),
    }
}

/// Once-per-name class resolution cache.
///
/// Resolution is attempted at most once per distinct fully-qualified
/// name: successes keep the handle, failures are remembered as hard
/// failures and never retried (and never retried with variant names).
#[derive(Debug, Default)]
pub(crate) struct ClassCache {
    resolved: FxHashMap<String, RawHandle>,
    failed: FxHashSet<String>,
}

/// Outcome of a cache probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CachedClass {
    /// Previously resolved to this handle.
    Resolved(RawHandle),
    /// Previously failed; do not retry.
    Failed,
    /// Never asked; resolution may be attempted once.
    Unknown,
}

impl ClassCache {
    pub(crate) fn probe(&self, name: &str) -> CachedClass {
        if let Some(&handle) = self.resolved.get(name) {
            CachedClass::Resolved(handle)
        } else if self.failed.contains(name) {
            CachedClass::Failed
        } else {
            CachedClass::Unknown
        }
    }

    pub(crate) fn record_resolved(&mut self, name: &str, handle: RawHandle) {
        self.resolved.insert(name.to_string(), handle);
    }

    pub(crate) fn record_failed(&mut self, name: &str) {
        self.failed.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lira_sdk::{entry, EntryPointRegistry, InstanceId, ManagedException, ResolverError};

    fn registry_with(
        name: &'static str,
        signature: &'static str,
        func: impl Fn(&mut dyn ResolverContext, &[EntryArg<'_>]) -> Result<EntryOut, ResolverError>
            + Send
            + Sync
            + 'static,
    ) -> EntryPointRegistry {
        let mut registry = EntryPointRegistry::new();
        for spec in entry::REQUIRED {
            registry.register(spec.name, spec.signature, |_cx, _args| Ok(EntryOut::Done));
        }
        registry.register(name, signature, func);
        registry
    }

    fn entered_cell() -> ContextCell {
        let cell = ContextCell::new(InstanceId::new(1));
        cell.rebind(lira_sdk::ExecutorHandle::for_current_thread(99));
        cell
    }

    #[test]
    fn test_dispatch_pushes_results() {
        let registry = registry_with(
            entry::OBJECT_READ.name,
            entry::OBJECT_READ.signature,
            |cx, _args| {
                cx.push(ScriptValue::Int(7));
                Ok(EntryOut::Pushed(1))
            },
        );
        let bindings = BindingTable::link(&registry).unwrap();
        let cell = entered_cell();
        let mut stack = ValueStack::new();

        let base = stack.len();
        let out = dispatch(
            &bindings,
            &cell,
            &mut stack,
            EntrySlot::ObjectRead,
            &[EntryArg::Handle(RawHandle::new(4)), EntryArg::Name("size")],
            0,
        )
        .unwrap();
        assert_eq!(expect_pushed(out, "readObjectMember", &stack, base), 1);
        assert_eq!(stack.top(), Some(&ScriptValue::Int(7)));
    }

    #[test]
    fn test_dispatch_failure_restores_stack() {
        let registry = registry_with(
            entry::OBJECT_INVOKE.name,
            entry::OBJECT_INVOKE.signature,
            |cx, _args| {
                // A partial push before the host throws must not leak.
                cx.push(ScriptValue::Str("partial".into()));
                Err(ResolverError::Exception(ManagedException::new("boom")))
            },
        );
        let bindings = BindingTable::link(&registry).unwrap();
        let cell = entered_cell();
        let mut stack = ValueStack::new();
        stack.push(ScriptValue::Int(1)); // caller state
        stack.push(ScriptValue::Int(2)); // the one call argument

        let err = dispatch(
            &bindings,
            &cell,
            &mut stack,
            EntrySlot::ObjectInvoke,
            &[
                EntryArg::Handle(RawHandle::new(4)),
                EntryArg::Name("explode"),
                EntryArg::Count(1),
            ],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Managed(_)));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_dispatch_exposes_argument_window() {
        let registry = registry_with(
            entry::CLASS_INVOKE.name,
            entry::CLASS_INVOKE.signature,
            |cx, args| {
                assert_eq!(args[2].as_count(), Some(2));
                assert_eq!(cx.arg_count(), 2);
                let a = cx.arg(0).and_then(ScriptValue::as_int).unwrap_or(0);
                let b = cx.arg(1).and_then(ScriptValue::as_int).unwrap_or(0);
                assert!(cx.arg(2).is_none());
                cx.push(ScriptValue::Int(a + b));
                Ok(EntryOut::Pushed(1))
            },
        );
        let bindings = BindingTable::link(&registry).unwrap();
        let cell = entered_cell();
        let mut stack = ValueStack::new();
        stack.push(ScriptValue::Int(20));
        stack.push(ScriptValue::Int(22));

        let base = stack.len();
        let out = dispatch(
            &bindings,
            &cell,
            &mut stack,
            EntrySlot::ClassInvoke,
            &[
                EntryArg::Handle(RawHandle::new(1)),
                EntryArg::Name("sum"),
                EntryArg::Count(2),
            ],
            2,
        )
        .unwrap();
        assert_eq!(expect_pushed(out, "invokeClassMember", &stack, base), 1);
        assert_eq!(stack.top(), Some(&ScriptValue::Int(42)));
    }

    #[test]
    fn test_class_cache_once_per_name() {
        let mut cache = ClassCache::default();
        assert_eq!(cache.probe("demo.Box"), CachedClass::Unknown);

        cache.record_resolved("demo.Box", RawHandle::new(8));
        assert_eq!(cache.probe("demo.Box"), CachedClass::Resolved(RawHandle::new(8)));

        cache.record_failed("demo.Missing");
        assert_eq!(cache.probe("demo.Missing"), CachedClass::Failed);
        // Distinct names are independent.
        assert_eq!(cache.probe("demo.Other"), CachedClass::Unknown);
    }
}
