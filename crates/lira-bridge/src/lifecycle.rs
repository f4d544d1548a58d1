//! Proxy reclamation.
//!
//! The Lira collector invokes [`Bridge::reclaim`] when a proxy becomes
//! unreachable. The proxy's release token is consumed exactly once across
//! all stack copies, so the host's `releaseHandle` runs at most once per
//! proxy lifetime. Reclaim order across proxies is unspecified. Once
//! shutdown has begun — or no executor is bound, meaning the managed side
//! is unreachable — release degrades to a no-op rather than a failure.

use std::sync::atomic::Ordering;

use lira_sdk::{EntryArg, EntryOut, Proxy};

use crate::bindings::EntrySlot;
use crate::bridge::Bridge;
use crate::error::{die, FatalError};
use crate::router::dispatch;
use crate::stack::ValueStack;

impl Bridge {
    /// Mark the managed side as shutting down: subsequent reclaims skip
    /// the host release call instead of failing against dead handles.
    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Finalization hook: release the proxy's handle back to the host.
    ///
    /// Idempotent per proxy (the first call across all aliasing copies
    /// wins). A host-side release failure is logged and swallowed — the
    /// collector cannot retry, and the handle token is already consumed.
    pub fn reclaim(&self, proxy: &Proxy) {
        let Some(handle) = proxy.token().take() else {
            // An aliasing copy already released this handle.
            return;
        };

        if self.is_shutting_down() {
            tracing::debug!(handle = handle.get(), "shutdown in progress, skipping release");
            return;
        }
        if self.cell.try_current().is_none() {
            tracing::warn!(
                handle = handle.get(),
                "no executor bound during reclaim, skipping release"
            );
            return;
        }

        let slot = EntrySlot::Release;
        let mut scratch = ValueStack::new();
        match dispatch(
            &self.bindings,
            &self.cell,
            &mut scratch,
            slot,
            &[EntryArg::Handle(handle)],
            0,
        ) {
            Ok(EntryOut::Done) => {}
            Ok(_) => die(FatalError::WrongReturnShape {
                name: self.bindings.get(slot).name(),
            }),
            Err(err) => {
                tracing::warn!(handle = handle.get(), error = %err, "host failed to release handle");
            }
        }
    }
}
