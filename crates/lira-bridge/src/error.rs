//! Bridge error taxonomy.
//!
//! Two recoverable families surface to script code: lookup failures and
//! managed exceptions. Two unrecoverable families terminate the process:
//! binding failures at initialization and protocol-invariant violations
//! at dispatch time. Continuing after either of the latter risks silent
//! corruption across both runtimes' heaps, so the policy is fail-fast.

use lira_sdk::{ManagedException, ProxyKind, ResolverError};
use thiserror::Error;

/// Recoverable dispatch error, surfaced as a script-level error.
///
/// Script code can catch these; the value stack has already been restored
/// to its pre-operation height when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Class-name resolution failed. Never retried for the same name.
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// Requested member or element not found on the target.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// The host raised an exception while servicing the dispatch.
    #[error("managed exception: {0}")]
    Managed(ManagedException),

    /// The proxy's kind does not carry this operation.
    #[error("{kind} proxy does not support {op}")]
    Unsupported {
        /// Kind of the proxy the operation was attempted on.
        kind: ProxyKind,
        /// Human-readable operation name.
        op: &'static str,
    },
}

impl From<ResolverError> for BridgeError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::Lookup(msg) => BridgeError::Lookup(msg),
            ResolverError::Exception(exc) => BridgeError::Managed(exc),
        }
    }
}

/// One fault found while linking the binding table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingFault {
    /// A required entry point is not registered.
    #[error("missing entry point: {name} {signature}")]
    Missing {
        /// Stable entry point name.
        name: &'static str,
        /// Signature the bridge expected.
        signature: &'static str,
    },

    /// A required entry point is registered with the wrong signature.
    #[error("entry point {name}: expected signature {expected}, found {found}")]
    SignatureMismatch {
        /// Stable entry point name.
        name: &'static str,
        /// Signature the bridge expected.
        expected: &'static str,
        /// Signature the host registered.
        found: String,
    },
}

/// Aggregated binding failure raised by [`crate::BindingTable::link`].
///
/// Names every missing or mismatched entry point. Fatal: the bridge must
/// not serve any proxy operation in a partially-initialized state, so
/// embedders are expected to abort on this (see
/// [`crate::Bridge::init_or_abort`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("binding initialization failed: {}", summarize(.faults))]
pub struct InitError {
    /// Every fault found during the link pass.
    pub faults: Vec<BindingFault>,
}

fn summarize(faults: &[BindingFault]) -> String {
    faults
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Broken cross-runtime invariant. Never recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    /// A dispatch ran without an executor handle bound for the reentry.
    #[error("no executor handle bound to the call-context cell")]
    ExecutorUnbound,

    /// The bound executor handle was produced on a different thread.
    #[error("executor handle used on a thread other than the one that produced it")]
    StaleExecutor,

    /// A proxy whose handle was already released reached the router.
    #[error("proxy handle used after release")]
    UseAfterRelease,

    /// Fewer values on the stack than the operation's argument window.
    #[error("value stack holds {have} values but the operation needs {needed}")]
    StackUnderflow {
        /// Window size the operation declared.
        needed: usize,
        /// Values actually on the stack.
        have: usize,
    },

    /// An entry point's pushed-value claim disagrees with the stack.
    #[error("entry point {name} claimed {claimed} pushed values but the stack grew by {actual}")]
    PushCountMismatch {
        /// Entry point that made the claim.
        name: &'static str,
        /// Values the entry point claimed to push.
        claimed: usize,
        /// Actual stack growth observed.
        actual: usize,
    },

    /// An entry point returned a result shape its signature forbids.
    #[error("entry point {name} returned a result of the wrong shape")]
    WrongReturnShape {
        /// The offending entry point.
        name: &'static str,
    },
}

/// Terminate the host process over a broken cross-runtime invariant.
///
/// Once one of these conditions is observed, both collectors may already
/// disagree about handle ownership; the only safe move is to stop.
pub(crate) fn die(err: FatalError) -> ! {
    tracing::error!(error = %err, "cross-runtime invariant broken, aborting");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_error_names_every_fault() {
        let err = InitError {
            faults: vec![
                BindingFault::Missing {
                    name: "invokeObjectMember",
                    signature: "(h,s,c)->n",
                },
                BindingFault::SignatureMismatch {
                    name: "arrayLength",
                    expected: "(h)->len",
                    found: "(h)->n".to_string(),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("invokeObjectMember"));
        assert!(msg.contains("arrayLength"));
        assert!(msg.contains("expected signature (h)->len"));
    }

    #[test]
    fn test_resolver_error_conversion() {
        let lookup: BridgeError = ResolverError::Lookup("no field".into()).into();
        assert_eq!(lookup, BridgeError::Lookup("no field".into()));

        let thrown: BridgeError =
            ResolverError::Exception(ManagedException::new("divide by zero")).into();
        match thrown {
            BridgeError::Managed(exc) => assert_eq!(exc.message, "divide by zero"),
            other => panic!("expected Managed, got {other:?}"),
        }
    }
}
