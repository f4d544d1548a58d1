//! The bridge: one linked instance of the proxy protocol.
//!
//! A `Bridge` ties together the binding table, the call-context cell, the
//! class-name cache, and the shutdown flag for one Lira runtime instance.
//! The host enters it at every reentry (rebinding the executor handle)
//! and the runtime routes proxy metamethod operations through it.

use std::sync::atomic::AtomicBool;

use lira_sdk::{
    EntryArg, EntryPointRegistry, ExecutorHandle, InstanceId, Proxy, ProxyKind, RawHandle,
    ScriptValue,
};
use parking_lot::Mutex;

use crate::bindings::{BindingTable, EntrySlot};
use crate::context::ContextCell;
use crate::error::{BridgeError, InitError};
use crate::router::{
    dispatch, expect_handle, expect_length, expect_pushed, live_handle, CachedClass, ClassCache,
    MemberKey,
};
use crate::stack::ValueStack;

/// Proxy bridge for one Lira runtime instance.
#[derive(Debug)]
pub struct Bridge {
    pub(crate) cell: ContextCell,
    pub(crate) bindings: BindingTable,
    pub(crate) classes: Mutex<ClassCache>,
    pub(crate) shutdown: AtomicBool,
}

impl Bridge {
    /// Link the host's entry points and construct the bridge.
    ///
    /// Fails with an aggregated [`InitError`] naming every missing or
    /// mismatched entry point. A failed init must be treated as fatal by
    /// the embedder: serving proxy operations against a partial binding
    /// table risks corrupting both heaps. [`Bridge::init_or_abort`] is
    /// the fail-fast wrapper.
    pub fn init(instance: InstanceId, registry: &EntryPointRegistry) -> Result<Self, InitError> {
        let bindings = BindingTable::link(registry)?;
        Ok(Self {
            cell: ContextCell::new(instance),
            bindings,
            classes: Mutex::new(ClassCache::default()),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Like [`Bridge::init`], but aborts the process on failure, naming
    /// the missing entry points in the diagnostic.
    pub fn init_or_abort(instance: InstanceId, registry: &EntryPointRegistry) -> Self {
        match Self::init(instance, registry) {
            Ok(bridge) => bridge,
            Err(err) => {
                tracing::error!(error = %err, "bridge initialization failed, aborting");
                std::process::abort()
            }
        }
    }

    /// The runtime-instance index this bridge serves.
    pub fn instance(&self) -> InstanceId {
        self.cell.instance()
    }

    /// Rebind the executor handle at the start of a reentry.
    ///
    /// Must be called before any dispatch whenever the host (re)enters
    /// this runtime instance — the previous handle is stale the moment a
    /// new reentry begins, even on the same thread.
    pub fn enter(&self, executor: ExecutorHandle) {
        self.cell.rebind(executor);
    }

    /// The executor handle bound for the current reentry.
    pub fn current_executor(&self) -> ExecutorHandle {
        self.cell.current()
    }

    /// Resolve a fully-qualified class name and push a class proxy.
    ///
    /// Resolution is attempted at most once per distinct name; a failed
    /// name stays failed ([`BridgeError::ClassNotFound`]) and is never
    /// retried or fuzzily matched. Repeated successes share one handle,
    /// so hosts are expected to keep class handles long-lived (class
    /// table slots in the reference host are never freed per-proxy).
    ///
    /// Returns the pushed-value count (always 1 on success).
    pub fn resolve_class(&self, stack: &mut ValueStack, name: &str) -> Result<usize, BridgeError> {
        match self.classes.lock().probe(name) {
            CachedClass::Resolved(handle) => {
                stack.push(ScriptValue::Proxy(Proxy::new(ProxyKind::Class, handle)));
                return Ok(1);
            }
            CachedClass::Failed => return Err(BridgeError::ClassNotFound(name.to_string())),
            CachedClass::Unknown => {}
        }

        let base = stack.len();
        let slot = EntrySlot::ResolveClass;
        match dispatch(
            &self.bindings,
            &self.cell,
            stack,
            slot,
            &[EntryArg::Name(name)],
            0,
        ) {
            Ok(out) => {
                let handle = expect_handle(out, self.bindings.get(slot).name(), stack, base);
                self.classes.lock().record_resolved(name, handle);
                stack.push(ScriptValue::Proxy(Proxy::new(ProxyKind::Class, handle)));
                Ok(1)
            }
            Err(BridgeError::Lookup(_)) => {
                self.classes.lock().record_failed(name);
                Err(BridgeError::ClassNotFound(name.to_string()))
            }
            // A managed exception is not a lookup verdict; do not cache.
            Err(other) => Err(other),
        }
    }

    /// Read a member: static lookup on a class proxy, field or bound
    /// method on an object proxy, indexed element on an array proxy.
    ///
    /// Returns the pushed-value count.
    pub fn read_member(
        &self,
        stack: &mut ValueStack,
        proxy: &Proxy,
        key: MemberKey<'_>,
    ) -> Result<usize, BridgeError> {
        let handle = live_handle(proxy);
        match (proxy.kind(), key) {
            (ProxyKind::Class, MemberKey::Name(name)) => self.pushed(
                stack,
                EntrySlot::ClassRead,
                &[EntryArg::Handle(handle), EntryArg::Name(name)],
                0,
            ),
            (ProxyKind::Object, MemberKey::Name(name)) => self.pushed(
                stack,
                EntrySlot::ObjectRead,
                &[EntryArg::Handle(handle), EntryArg::Name(name)],
                0,
            ),
            (ProxyKind::Array, MemberKey::Index(index)) => self.pushed(
                stack,
                EntrySlot::ArrayRead,
                &[EntryArg::Handle(handle), EntryArg::Index(index)],
                0,
            ),
            (kind, MemberKey::Name(_)) => Err(BridgeError::Unsupported {
                kind,
                op: "named member read",
            }),
            (kind, MemberKey::Index(_)) => Err(BridgeError::Unsupported {
                kind,
                op: "indexed read",
            }),
        }
    }

    /// Write a member. The value to assign must already be on top of the
    /// stack; it forms the operation's one-slot argument window.
    ///
    /// Returns the pushed-value count (normally 0).
    pub fn write_member(
        &self,
        stack: &mut ValueStack,
        proxy: &Proxy,
        key: MemberKey<'_>,
    ) -> Result<usize, BridgeError> {
        let handle = live_handle(proxy);
        match (proxy.kind(), key) {
            (ProxyKind::Class, MemberKey::Name(name)) => self.pushed(
                stack,
                EntrySlot::ClassWrite,
                &[EntryArg::Handle(handle), EntryArg::Name(name)],
                1,
            ),
            (ProxyKind::Object, MemberKey::Name(name)) => self.pushed(
                stack,
                EntrySlot::ObjectWrite,
                &[EntryArg::Handle(handle), EntryArg::Name(name)],
                1,
            ),
            (ProxyKind::Array, MemberKey::Index(index)) => self.pushed(
                stack,
                EntrySlot::ArrayWrite,
                &[EntryArg::Handle(handle), EntryArg::Index(index)],
                1,
            ),
            (kind, MemberKey::Name(_)) => Err(BridgeError::Unsupported {
                kind,
                op: "named member write",
            }),
            (kind, MemberKey::Index(_)) => Err(BridgeError::Unsupported {
                kind,
                op: "indexed write",
            }),
        }
    }

    /// Invoke a method by name. The `arg_count` call arguments must
    /// already be on top of the stack. Overload selection among methods
    /// sharing the name is entirely the host's policy.
    ///
    /// Returns the pushed-value count.
    pub fn invoke(
        &self,
        stack: &mut ValueStack,
        proxy: &Proxy,
        name: &str,
        arg_count: usize,
    ) -> Result<usize, BridgeError> {
        let handle = live_handle(proxy);
        let slot = match proxy.kind() {
            ProxyKind::Class => EntrySlot::ClassInvoke,
            ProxyKind::Object => EntrySlot::ObjectInvoke,
            ProxyKind::Array => {
                return Err(BridgeError::Unsupported {
                    kind: ProxyKind::Array,
                    op: "method invocation",
                })
            }
        };
        self.pushed(
            stack,
            slot,
            &[
                EntryArg::Handle(handle),
                EntryArg::Name(name),
                EntryArg::Count(arg_count),
            ],
            arg_count,
        )
    }

    /// Invoke a constructor on a class proxy. The `arg_count` call
    /// arguments must already be on top of the stack.
    ///
    /// Returns the pushed-value count (1 object proxy on success).
    pub fn construct(
        &self,
        stack: &mut ValueStack,
        proxy: &Proxy,
        arg_count: usize,
    ) -> Result<usize, BridgeError> {
        let handle = live_handle(proxy);
        match proxy.kind() {
            ProxyKind::Class => self.pushed(
                stack,
                EntrySlot::ClassConstruct,
                &[EntryArg::Handle(handle), EntryArg::Count(arg_count)],
                arg_count,
            ),
            kind => Err(BridgeError::Unsupported {
                kind,
                op: "construction",
            }),
        }
    }

    /// Element count of an array proxy, pushed as an integer.
    ///
    /// Returns the pushed-value count (always 1 on success).
    pub fn length(&self, stack: &mut ValueStack, proxy: &Proxy) -> Result<usize, BridgeError> {
        let handle = live_handle(proxy);
        match proxy.kind() {
            ProxyKind::Array => {
                let base = stack.len();
                let slot = EntrySlot::ArrayLength;
                let out = dispatch(
                    &self.bindings,
                    &self.cell,
                    stack,
                    slot,
                    &[EntryArg::Handle(handle)],
                    0,
                )?;
                let len = expect_length(out, self.bindings.get(slot).name(), stack, base);
                stack.push(ScriptValue::Int(len as i64));
                Ok(1)
            }
            kind => Err(BridgeError::Unsupported { kind, op: "length" }),
        }
    }

    /// Dispatch to `slot` and validate the pushed-value claim.
    fn pushed(
        &self,
        stack: &mut ValueStack,
        slot: EntrySlot,
        args: &[EntryArg<'_>],
        window: usize,
    ) -> Result<usize, BridgeError> {
        let base = stack.len();
        let out = dispatch(&self.bindings, &self.cell, stack, slot, args, window)?;
        Ok(expect_pushed(
            out,
            self.bindings.get(slot).name(),
            stack,
            base,
        ))
    }
}
