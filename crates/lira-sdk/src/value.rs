//! Script-side values and managed-entity proxies.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::handle::RawHandle;

/// Which kind of managed entity a proxy stands in for.
///
/// The kind selects the capability set: classes and objects answer member
/// operations, arrays answer indexed operations and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// A managed class (static members, constructors).
    Class,
    /// A managed instance (fields, bound methods).
    Object,
    /// A managed array (indexed elements, length).
    Array,
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Class => write!(f, "class"),
            ProxyKind::Object => write!(f, "object"),
            ProxyKind::Array => write!(f, "array"),
        }
    }
}

/// Take-once slot holding a proxy's handle.
///
/// Stack copies of a proxy clone the token and therefore alias one slot;
/// whichever reclaim path runs first consumes the handle, so the host's
/// release operation is called at most once per proxy lifetime no matter
/// how many copies the script made.
#[derive(Clone)]
pub struct ReleaseToken {
    slot: Arc<Mutex<Option<RawHandle>>>,
}

impl ReleaseToken {
    /// Create a token owning `handle`.
    pub fn new(handle: RawHandle) -> Self {
        ReleaseToken {
            slot: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Read the handle without consuming it. `None` after release.
    pub fn peek(&self) -> Option<RawHandle> {
        match self.slot.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Consume the handle. Only the first call returns `Some`.
    pub fn take(&self) -> Option<RawHandle> {
        match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl fmt::Debug for ReleaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(handle) => write!(f, "ReleaseToken({})", handle.get()),
            None => write!(f, "ReleaseToken(<released>)"),
        }
    }
}

/// Script-visible stand-in for a managed entity.
///
/// Carries the opaque handle and a kind tag; all behavior lives in the
/// bridge's dispatch, which routes operations on the proxy to the host.
/// Construction never validates handle liveness — that is the host's job
/// when the handle is next used.
#[derive(Debug, Clone)]
pub struct Proxy {
    kind: ProxyKind,
    token: ReleaseToken,
}

impl Proxy {
    /// Create a proxy of the given kind wrapping `handle`.
    pub fn new(kind: ProxyKind, handle: RawHandle) -> Self {
        Proxy {
            kind,
            token: ReleaseToken::new(handle),
        }
    }

    /// The proxy's kind tag.
    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// The wrapped handle, or `None` once the proxy has been reclaimed.
    pub fn handle(&self) -> Option<RawHandle> {
        self.token.peek()
    }

    /// The shared release token.
    pub fn token(&self) -> &ReleaseToken {
        &self.token
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.handle() == other.handle()
    }
}

/// A value on the Lira value stack, as seen by the bridge.
///
/// The tagged-union analogue of the runtime's internal representation;
/// only the variants that cross the bridge boundary appear here.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// Absence of a value.
    Nil,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Num(f64),
    /// Owned string.
    Str(String),
    /// Managed-entity proxy.
    Proxy(Proxy),
}

impl ScriptValue {
    /// Get as boolean if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer if this is an int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float if this is a num.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            ScriptValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice if this is a str.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the proxy if this value is one.
    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            ScriptValue::Proxy(p) => Some(p),
            _ => None,
        }
    }

    /// Check if this is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_token_takes_once() {
        let token = ReleaseToken::new(RawHandle::new(5));
        assert_eq!(token.peek(), Some(RawHandle::new(5)));
        assert_eq!(token.take(), Some(RawHandle::new(5)));
        assert_eq!(token.take(), None);
        assert_eq!(token.peek(), None);
    }

    #[test]
    fn test_cloned_proxy_shares_token() {
        let a = Proxy::new(ProxyKind::Object, RawHandle::new(11));
        let b = a.clone();
        assert_eq!(a.token().take(), Some(RawHandle::new(11)));
        // The clone aliases the same slot.
        assert_eq!(b.token().take(), None);
        assert_eq!(b.handle(), None);
    }

    #[test]
    fn test_script_value_accessors() {
        assert_eq!(ScriptValue::Int(3).as_int(), Some(3));
        assert_eq!(ScriptValue::Str("x".into()).as_str(), Some("x"));
        assert_eq!(ScriptValue::Bool(true).as_bool(), Some(true));
        assert!(ScriptValue::Nil.is_nil());
        assert_eq!(ScriptValue::Nil.as_int(), None);

        let p = Proxy::new(ProxyKind::Array, RawHandle::new(1));
        let v = ScriptValue::Proxy(p);
        assert_eq!(v.as_proxy().map(|p| p.kind()), Some(ProxyKind::Array));
    }
}
