//! Error types and handling for stepwise
//!
//! Provides the `StepwiseError` enum and the crate-wide `Result` alias.

use thiserror::Error;

/// Comprehensive error enum for all stepwise operations
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// Failure on a transport (socket closed, framing broken)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Malformed or unexpected protocol payload
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The language runtime reported an error for an LRDP call
    #[error("Language runtime error: {message}")]
    Runtime { message: String },

    /// An inbound request carried invalid arguments
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// A request that needs a launched session arrived too early
    #[error("Debug session is not initialized")]
    NotInitialized,

    /// A second initialize/launch arrived for the same session
    #[error("Debug session is already initialized")]
    AlreadyInitialized,

    /// The engine was asked to move with no step selected
    #[error("No step is currently selected")]
    NoSelectedStep,

    /// A composite-only operation was invoked on an atomic step
    #[error("Step '{id}' is not a composite step")]
    NotComposite { id: String },

    /// An atomic-only operation was invoked on a composite step
    #[error("Step '{id}' is not an atomic step")]
    NotAtomic { id: String },

    /// The terminated event was emitted twice by the engine
    #[error("Termination event was already sent")]
    TerminationAlreadySent,

    /// Invariant violation inside the debugger itself
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StepwiseError {
    /// Shorthand for a transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Shorthand for a protocol violation
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Shorthand for an invalid inbound request
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// True when the session cannot be used after this error
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::NoSelectedStep
                | Self::NotComposite { .. }
                | Self::NotAtomic { .. }
                | Self::TerminationAlreadySent
                | Self::Internal { .. }
        )
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, StepwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StepwiseError::transport("connection reset").is_fatal());
        assert!(StepwiseError::NoSelectedStep.is_fatal());
        assert!(!StepwiseError::NotInitialized.is_fatal());
        assert!(!StepwiseError::invalid_request("bad arguments").is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = StepwiseError::NotComposite {
            id: "step-3".to_string(),
        };
        assert_eq!(err.to_string(), "Step 'step-3' is not a composite step");
    }
}
