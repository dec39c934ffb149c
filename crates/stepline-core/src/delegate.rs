use tracing::Span;

use crate::action::Action;
use crate::error::StepError;

/// Observer of an [`ActionsStep`](crate::ActionsStep) run.
///
/// `action_completed` fires once per action whose `run` returned `Ok`, in
/// execution order. `failed` fires at most once per run, on the hard-failure
/// path; cancellations arrive as [`StepError::Interrupted`].
pub trait BuildEventsDelegate: Send + Sync {
    fn action_completed(&self, logger: &Span, action: &dyn Action);

    fn failed(&self, logger: &Span, err: &StepError);
}
