//! Emitter error types

use thiserror::Error;

/// Error returned by a listener callback. Passed back to the `emit` caller untouched.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by listener callbacks.
pub type ListenerResult = Result<(), ListenerError>;

/// Result type for emitter operations.
pub type EmitterResult<T> = Result<T, EmitterError>;

/// Error type for emitter operations.
#[derive(Debug, Error)]
pub enum EmitterError {
    /// Rejected input, raised before any registry change.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A listener failed while `event` was being dispatched. Remaining
    /// listeners of that dispatch were not invoked.
    #[error("Listener for '{event}' failed: {source}")]
    Listener {
        event: String,
        #[source]
        source: ListenerError,
    },

    /// Config could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmitterError {
    /// `InvalidArgument` for a required parameter that was not given.
    pub fn missing_parameter(name: &str) -> Self {
        EmitterError::InvalidArgument(format!("missing parameter: {name}"))
    }

    /// The listener error behind a failed dispatch, if this is one.
    ///
    /// A listener that emits again and propagates the failure with `?` wraps
    /// it once per level, so this may itself be an `EmitterError::Listener`.
    /// Use [`EmitterError::root_listener_error`] to reach the original.
    pub fn listener_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            EmitterError::Listener { source, .. } => Some(&**source),
            _ => None,
        }
    }

    /// The innermost listener error, unwrapping nested dispatch failures.
    pub fn root_listener_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        let mut current = self.listener_error()?;
        while let Some(inner) = current
            .downcast_ref::<EmitterError>()
            .and_then(EmitterError::listener_error)
        {
            current = inner;
        }
        Some(current)
    }
}

impl From<toml::de::Error> for EmitterError {
    fn from(err: toml::de::Error) -> Self {
        EmitterError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_missing_parameter_message() {
        let err = EmitterError::missing_parameter("event");
        assert_eq!(err.to_string(), "Invalid argument: missing parameter: event");
    }

    #[test]
    fn test_listener_error_is_kept_as_source() {
        let err = EmitterError::Listener {
            event: "data".to_string(),
            source: Box::new(std::io::Error::other("disk gone")),
        };

        assert_eq!(err.to_string(), "Listener for 'data' failed: disk gone");
        let inner = err.listener_error().unwrap();
        assert!(inner.downcast_ref::<std::io::Error>().is_some());
        assert_eq!(err.source().unwrap().to_string(), "disk gone");
        assert!(err.root_listener_error().unwrap().downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_root_listener_error_unwraps_nested_dispatch() {
        let inner = EmitterError::Listener {
            event: "inner".to_string(),
            source: Box::new(std::io::Error::other("boom")),
        };
        let outer = EmitterError::Listener {
            event: "outer".to_string(),
            source: Box::new(inner),
        };

        assert!(outer.listener_error().unwrap().downcast_ref::<std::io::Error>().is_none());
        let root = outer.root_listener_error().unwrap();
        assert_eq!(root.downcast_ref::<std::io::Error>().unwrap().to_string(), "boom");
        assert!(EmitterError::missing_parameter("event").root_listener_error().is_none());
    }
}
