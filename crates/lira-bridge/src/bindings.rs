//! One-time resolution of host entry points into a binding table.
//!
//! At initialization the bridge resolves every required entry point from
//! the host's registry by stable name, checking the registered signature
//! against the expected one. After linking, dispatch is a direct indexed
//! call into a fixed table — no name lookup at runtime. Any missing or
//! mismatched entry point fails the whole link with a single aggregated
//! error; the bridge never serves a proxy operation half-initialized.

use lira_sdk::{entry, EntryArg, EntryPointFn, EntryPointRegistry, EntryResult, ResolverContext};

use crate::error::{BindingFault, InitError};

/// Index of one required entry point in the linked table.
///
/// Discriminants follow the order of [`entry::REQUIRED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntrySlot {
    ResolveClass = 0,
    ClassRead,
    ClassWrite,
    ClassInvoke,
    ClassConstruct,
    ObjectRead,
    ObjectWrite,
    ObjectInvoke,
    ArrayLength,
    ArrayRead,
    ArrayWrite,
    Release,
}

/// A linked entry point: resolved callable plus its stable name for
/// diagnostics.
pub(crate) struct Binding {
    name: &'static str,
    func: EntryPointFn,
}

impl Binding {
    /// Stable name, for error and log messages.
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Invoke the bound entry point.
    pub(crate) fn call(&self, cx: &mut dyn ResolverContext, args: &[EntryArg<'_>]) -> EntryResult {
        (self.func)(cx, args)
    }
}

/// Resolved entry point table, immutable after [`BindingTable::link`].
///
/// Concurrent reads are safe; no writes occur post-link.
pub struct BindingTable {
    bound: Vec<Binding>,
}

impl std::fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTable")
            .field("count", &self.bound.len())
            .finish()
    }
}

impl BindingTable {
    /// Resolve every required entry point from `registry`.
    ///
    /// Returns an [`InitError`] naming every missing or signature-
    /// mismatched entry point; on error no table exists and the bridge
    /// cannot be constructed.
    pub fn link(registry: &EntryPointRegistry) -> Result<Self, InitError> {
        let mut bound = Vec::with_capacity(entry::REQUIRED.len());
        let mut faults = Vec::new();

        for spec in entry::REQUIRED {
            match registry.get(spec.name) {
                Some(registered) if registered.signature() == spec.signature => {
                    bound.push(Binding {
                        name: spec.name,
                        func: registered.func(),
                    });
                }
                Some(registered) => faults.push(BindingFault::SignatureMismatch {
                    name: spec.name,
                    expected: spec.signature,
                    found: registered.signature().to_string(),
                }),
                None => faults.push(BindingFault::Missing {
                    name: spec.name,
                    signature: spec.signature,
                }),
            }
        }

        if faults.is_empty() {
            Ok(Self { bound })
        } else {
            Err(InitError { faults })
        }
    }

    /// Fetch a linked entry point by slot.
    pub(crate) fn get(&self, slot: EntrySlot) -> &Binding {
        // The table is only constructed with the full required set, in
        // REQUIRED order, so slot discriminants index it directly.
        &self.bound[slot as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lira_sdk::EntryOut;

    fn full_registry() -> EntryPointRegistry {
        let mut registry = EntryPointRegistry::new();
        for spec in entry::REQUIRED {
            registry.register(spec.name, spec.signature, |_cx, _args| Ok(EntryOut::Done));
        }
        registry
    }

    #[test]
    fn test_link_full_registry() {
        let table = BindingTable::link(&full_registry()).unwrap();
        assert_eq!(table.get(EntrySlot::ResolveClass).name(), "resolveClassByName");
        assert_eq!(table.get(EntrySlot::Release).name(), "releaseHandle");
        assert_eq!(table.get(EntrySlot::ArrayLength).name(), "arrayLength");
    }

    #[test]
    fn test_link_missing_entry_point() {
        let mut registry = EntryPointRegistry::new();
        for spec in entry::REQUIRED {
            if spec.name != entry::OBJECT_INVOKE.name {
                registry.register(spec.name, spec.signature, |_cx, _args| Ok(EntryOut::Done));
            }
        }

        let err = BindingTable::link(&registry).unwrap_err();
        assert_eq!(err.faults.len(), 1);
        assert!(err.to_string().contains("invokeObjectMember"));
    }

    #[test]
    fn test_link_signature_mismatch() {
        let mut registry = full_registry();
        // Re-register with a wrong signature.
        registry.register(entry::ARRAY_LENGTH.name, "(h)->n", |_cx, _args| {
            Ok(EntryOut::Done)
        });

        let err = BindingTable::link(&registry).unwrap_err();
        assert_eq!(
            err.faults,
            vec![BindingFault::SignatureMismatch {
                name: "arrayLength",
                expected: "(h)->len",
                found: "(h)->n".to_string(),
            }]
        );
    }

    #[test]
    fn test_link_aggregates_all_faults() {
        let registry = EntryPointRegistry::new();
        let err = BindingTable::link(&registry).unwrap_err();
        assert_eq!(err.faults.len(), entry::REQUIRED.len());
        for spec in entry::REQUIRED {
            assert!(err.to_string().contains(spec.name));
        }
    }
}
