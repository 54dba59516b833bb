//! Error type shared by the async-operation hooks.

use futures_util::future::Aborted;
use std::fmt;

/// An error produced by a wrapped asynchronous operation.
///
/// Every failure is normalized into this type before it reaches state or
/// callbacks, so UI code only ever deals with one representation. Values that
/// are not errors themselves (plain strings, numbers) keep their string form
/// as the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// The operation failed.
    #[error("{message}")]
    Operation { message: String },
    /// The operation was superseded or torn down before it settled.
    ///
    /// Never stored in state; cancelled calls settle silently.
    #[error("operation was cancelled")]
    Cancelled,
}

impl HookError {
    /// Wrap any displayable value as an operation failure.
    pub fn from_display(value: impl fmt::Display) -> Self {
        HookError::Operation {
            message: value.to_string(),
        }
    }

    /// Whether this error is a cancellation signal rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HookError::Cancelled)
    }

    /// The human-readable message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        HookError::Operation { message }
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        HookError::from_display(message)
    }
}

impl From<std::io::Error> for HookError {
    fn from(err: std::io::Error) -> Self {
        HookError::from_display(err)
    }
}

impl From<Aborted> for HookError {
    fn from(_: Aborted) -> Self {
        HookError::Cancelled
    }
}

/// Result type for async-operation hooks.
pub type HookResult<T> = Result<T, HookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_strings_become_operation_errors() {
        let err: HookError = "boom".into();
        assert_eq!(
            err,
            HookError::Operation {
                message: "boom".to_string()
            }
        );
        assert_eq!(err.message(), "boom");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn non_error_values_keep_their_string_form() {
        let err = HookError::from_display(404);
        assert_eq!(err.to_string(), "404");
    }

    #[test]
    fn aborted_maps_to_cancelled() {
        let err = HookError::from(Aborted);
        assert!(err.is_cancelled());
    }
}
