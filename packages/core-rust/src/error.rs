//! Error types for ambient request-context lookup.

/// Errors returned by the global accessors in [`crate::accessors`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// An accessor ran outside any `scope::run` / `scope::run_sync` extent.
    ///
    /// This is a usage error: the calling code is not part of a request
    /// chain (for example, it runs during process startup or in a task
    /// spawned without [`crate::scope::spawn`]).
    #[error("no active request context: `{accessor}()` was called outside a request scope")]
    NoActiveContext {
        /// Name of the accessor that was invoked.
        accessor: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_accessor() {
        let err = ContextError::NoActiveContext { accessor: "logger" };
        let msg = err.to_string();
        assert!(msg.contains("no active request context"));
        assert!(msg.contains("`logger()`"));
    }
}
