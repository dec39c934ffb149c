use thiserror::Error;

/// The two ways an [`ExecContext`](crate::ExecContext) can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Error)]
pub enum StepError {
    /// The execution context was cancelled or hit its deadline.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Sanitized stand-in for [`StepError::Context`], handed to event
    /// delegates in place of the raw cancellation error.
    #[error("interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("action failed: {0}")]
    Action(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    /// Returns the underlying [`ContextError`] when this error is the
    /// execution context ending, either directly or wrapped in `Other`.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            StepError::Context(e) => Some(*e),
            StepError::Other(e) => e.downcast_ref::<ContextError>().copied(),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.context_error().is_some()
    }
}

pub type Result<T> = std::result::Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_message_is_fixed() {
        assert_eq!(StepError::Interrupted.to_string(), "interrupted");
    }

    #[test]
    fn context_errors_keep_their_messages() {
        assert_eq!(
            StepError::from(ContextError::Canceled).to_string(),
            "context canceled"
        );
        assert_eq!(
            StepError::from(ContextError::DeadlineExceeded).to_string(),
            "context deadline exceeded"
        );
    }

    #[test]
    fn wrapped_context_error_is_still_a_cancellation() {
        let err = StepError::Other(anyhow::Error::new(ContextError::DeadlineExceeded));
        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
        assert!(err.is_cancellation());
    }

    #[test]
    fn message_lookalikes_are_not_cancellations() {
        assert!(!StepError::Action("context canceled".into()).is_cancellation());
        assert!(!StepError::Other(anyhow::anyhow!("context canceled")).is_cancellation());
        assert!(!StepError::Interrupted.is_cancellation());
    }
}
