//! Error types crossing the resolver boundary.

/// An exception raised inside the managed host while servicing a dispatch.
///
/// Carries at minimum the exception's message text. Kept distinct from a
/// lookup failure so the bridge never confuses "the host threw" with
/// "the member does not exist".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ManagedException {
    /// The exception's description, as rendered by the host.
    pub message: String,
}

impl ManagedException {
    /// Create an exception from its message text.
    pub fn new(message: impl Into<String>) -> Self {
        ManagedException {
            message: message.into(),
        }
    }
}

/// Failure signal returned by a resolver entry point.
///
/// Both variants are recoverable at the script level; the bridge converts
/// them into script errors after restoring the value stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// Requested class, member, or element not found.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// The host raised an exception during the routed call.
    #[error("managed exception: {0}")]
    Exception(#[from] ManagedException),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_keeps_message() {
        let err = ResolverError::from(ManagedException::new("boom"));
        assert_eq!(err.to_string(), "managed exception: boom");
    }

    #[test]
    fn test_lookup_distinct_from_exception() {
        let lookup = ResolverError::Lookup("no such member".into());
        let thrown = ResolverError::Exception(ManagedException::new("no such member"));
        assert_ne!(lookup, thrown);
    }
}
