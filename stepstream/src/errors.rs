//! Error types for step execution.
//!
//! Errors fall into three families:
//!
//! - **Wrapped-function errors** travel inside an [`Outcome`] and never cross
//!   the step boundary.
//! - **Setup errors** are returned directly from `start`, before any work is
//!   launched.
//! - **Misuse** (double start, double close, overfilled queue) is reported as an
//!   explicit error instead of corrupting step state.

use crate::execution::ExecutionState;
use thiserror::Error;

/// The outcome of one invocation of a wrapped function.
///
/// Exactly one of value or error is present by construction.
pub type Outcome<T> = Result<T, StepError>;

/// The main error type for step operations.
#[derive(Debug, Error)]
pub enum StepError {
    /// The wrapped function failed.
    #[error("{0}")]
    Failed(String),

    /// The wrapped function observed a cancelled context.
    #[error("step cancelled: {0}")]
    Cancelled(String),

    /// A provider collaborator reported a failure.
    #[error("provider {provider} failed: {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Provider error message.
        message: String,
    },

    /// Required settings are missing.
    #[error("missing settings: {0}")]
    MissingSettings(String),

    /// Settings are present but invalid.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The step input was rejected before execution.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `start` was called on a one-shot step that already started.
    #[error("step already started")]
    AlreadyStarted,

    /// `close` was called before `start`.
    #[error("step not started")]
    NotStarted,

    /// `close` was called more than once.
    #[error("step already closed")]
    AlreadyClosed,

    /// An execution state transition skipped or reversed a state.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// State observed at the time of the transition.
        from: ExecutionState,
        /// Requested target state.
        to: ExecutionState,
    },

    /// More results were produced than the completion queue has slots.
    #[error("completion queue overflow (capacity {capacity})")]
    QueueOverflow {
        /// Queue capacity.
        capacity: usize,
    },

    /// The background task panicked before producing all of its results.
    #[error("background task panicked: {0}")]
    TaskPanicked(String),

    /// An error raised by a collaborator using `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    /// Creates a wrapped-function failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Creates a provider failure.
    #[must_use]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors raised before any work was launched.
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSettings(_) | Self::InvalidSettings(_) | Self::InvalidInput(_)
        )
    }

    /// Returns true for lifecycle misuse.
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted
                | Self::NotStarted
                | Self::AlreadyClosed
                | Self::InvalidTransition { .. }
                | Self::QueueOverflow { .. }
        )
    }

    /// Returns true if the error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_displays_bare_message() {
        let err = StepError::failed("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_provider_error_display() {
        let err = StepError::provider("vertex", "quota exceeded");
        assert!(err.to_string().contains("vertex"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_setup_error_classification() {
        assert!(StepError::MissingSettings("client".into()).is_setup_error());
        assert!(StepError::InvalidInput("empty".into()).is_setup_error());
        assert!(!StepError::failed("x").is_setup_error());
    }

    #[test]
    fn test_misuse_classification() {
        assert!(StepError::AlreadyStarted.is_misuse());
        assert!(StepError::AlreadyClosed.is_misuse());
        assert!(StepError::QueueOverflow { capacity: 1 }.is_misuse());
        assert!(!StepError::Cancelled("stop".into()).is_misuse());
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = StepError::InvalidTransition {
            from: ExecutionState::NotStarted,
            to: ExecutionState::Finished,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition from not_started to finished"
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err: StepError = anyhow::anyhow!("collaborator broke").into();
        assert_eq!(err.to_string(), "collaborator broke");
        assert!(!err.is_cancelled());
    }
}
