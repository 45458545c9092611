//! Loader error taxonomy.
//!
//! Every failure a caller of `require`/`use` can observe is one of these
//! variants. Errors are `Clone` because a single failed fetch is delivered to
//! every continuation queued on the modules it was supposed to define.

use std::fmt;

/// Structured loader errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// A module was initialized but no defining function was ever registered
    /// for it. This is a caller error and is never retried.
    ModuleNotFound {
        /// Identifier that was required
        identifier: String,
    },

    /// The transport reported a failed fetch for the module's location.
    Transport {
        /// Identifier that was waiting on the fetch
        identifier: String,
        /// Location the transport was asked for
        location: String,
        /// Transport error rendered with its context chain
        message: String,
    },

    /// The fetch for the module's location did not complete in time.
    Timeout {
        identifier: String,
        location: String,
        /// Configured limit in milliseconds
        after_ms: u64,
    },

    /// The fetch completed but the fetched code never defined the module.
    NotDefined { identifier: String, location: String },

    /// The module's defining function returned an error. The module stays
    /// failed; later requests report the same error.
    DefinitionFailed {
        identifier: String,
        /// Error returned by the defining function
        message: String,
    },

    /// The loader went away before producing a result.
    Shutdown,
}

impl LoadError {
    pub fn module_not_found(identifier: impl Into<String>) -> Self {
        LoadError::ModuleNotFound {
            identifier: identifier.into(),
        }
    }

    /// Identifier of the module this error is about, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            LoadError::ModuleNotFound { identifier }
            | LoadError::Transport { identifier, .. }
            | LoadError::Timeout { identifier, .. }
            | LoadError::NotDefined { identifier, .. }
            | LoadError::DefinitionFailed { identifier, .. } => Some(identifier),
            LoadError::Shutdown => None,
        }
    }

    /// Whether a fresh loader could plausibly succeed where this one failed.
    ///
    /// Informational only: the loader itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Transport { .. } | LoadError::Timeout { .. })
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::ModuleNotFound { identifier } => {
                write!(f, "Module {} not found!", identifier)
            }
            LoadError::Transport {
                identifier,
                location,
                message,
            } => write!(
                f,
                "failed to fetch {} for module {}: {}",
                location, identifier, message
            ),
            LoadError::Timeout {
                identifier,
                location,
                after_ms,
            } => write!(
                f,
                "load timeout: {} for module {} did not arrive within {}ms",
                location, identifier, after_ms
            ),
            LoadError::NotDefined {
                identifier,
                location,
            } => write!(
                f,
                "{} was fetched but never defined module {}",
                location, identifier
            ),
            LoadError::DefinitionFailed {
                identifier,
                message,
            } => write!(f, "module {} failed to initialize: {}", identifier, message),
            LoadError::Shutdown => write!(f, "loader shut down before the request completed"),
        }
    }
}

impl std::error::Error for LoadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_module_not_found() {
        let err = LoadError::module_not_found("app/main");
        assert_eq!(err.to_string(), "Module app/main not found!");
        assert_eq!(err.identifier(), Some("app/main"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable_and_mentions_limit() {
        let err = LoadError::Timeout {
            identifier: "lib/slow".into(),
            location: "/static/lib/slow".into(),
            after_ms: 1500,
        };
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("load timeout"));
        assert!(err.to_string().contains("1500ms"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = LoadError::module_not_found("x").into();
        assert!(err.downcast_ref::<LoadError>().is_some());
    }
}
