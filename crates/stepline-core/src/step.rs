use std::sync::Arc;

use async_trait::async_trait;
use tracing::Span;

use crate::action::Action;
use crate::context::ExecContext;
use crate::delegate::BuildEventsDelegate;
use crate::error::StepError;
use crate::repository::ArtifactRepository;
use crate::Result;

// ─── Step / StepFactory ───────────────────────────────────────────────────

/// A runnable pipeline step bound to an artifact repository.
#[async_trait]
pub trait Step: Send {
    async fn run(&mut self, ctx: &ExecContext) -> Result<()>;

    /// Only meaningful after `run` returned `Ok`.
    fn succeeded(&self) -> bool;
}

/// Produces a [`Step`] bound to a given repository.
pub trait StepFactory {
    fn using(&self, repository: ArtifactRepository) -> Box<dyn Step>;
}

// ─── StepState ────────────────────────────────────────────────────────────

/// Lifecycle of a single [`ActionsStep`] run.
///
/// Transitions: `NotStarted → Running → Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    NotStarted,
    Running,
    Completed { succeeded: bool },
    Failed,
}

// ─── ActionsStep ──────────────────────────────────────────────────────────

/// Runs a fixed list of actions one after another and reports each outcome
/// to a [`BuildEventsDelegate`].
///
/// The first hard error stops the run. A non-zero exit status does not; it
/// only turns [`succeeded`](Self::succeeded) false.
///
/// `succeeded` is written only when the whole list ran without a hard error.
/// After a failed run it still holds its previous value (`false` for a fresh
/// step), so check the result of [`run`](Self::run) before reading it.
#[derive(Clone)]
pub struct ActionsStep {
    actions: Arc<[Arc<dyn Action>]>,
    delegate: Arc<dyn BuildEventsDelegate>,
    logger: Span,
    repository: ArtifactRepository,
    succeeded: bool,
    state: StepState,
}

impl ActionsStep {
    /// The step starts bound to an empty repository of its own; use
    /// [`using`](Self::using) to share one with the rest of the pipeline.
    pub fn new(
        logger: Span,
        actions: Vec<Arc<dyn Action>>,
        delegate: Arc<dyn BuildEventsDelegate>,
    ) -> Self {
        Self {
            actions: actions.into(),
            delegate,
            logger,
            repository: ArtifactRepository::new(),
            succeeded: false,
            state: StepState::NotStarted,
        }
    }

    /// A copy of this step bound to `repository`. `self` keeps its binding.
    pub fn using(&self, repository: ArtifactRepository) -> ActionsStep {
        ActionsStep {
            repository,
            ..self.clone()
        }
    }

    /// Run every action in order against the bound repository.
    ///
    /// Returns the first hard error unchanged. When that error is `ctx`
    /// ending, the delegate is told [`StepError::Interrupted`] instead.
    pub async fn run(&mut self, ctx: &ExecContext) -> Result<()> {
        self.state = StepState::Running;
        let actions = Arc::clone(&self.actions);

        let mut succeeded = true;
        for action in actions.iter() {
            tracing::debug!(parent: &self.logger, action = action.name(), "running-action");

            if let Err(err) = action.run(ctx, &self.logger, &self.repository).await {
                self.state = StepState::Failed;

                if err.is_cancellation() {
                    tracing::debug!(parent: &self.logger, action = action.name(), reason = %err, "interrupted");
                    self.delegate.failed(&self.logger, &StepError::Interrupted);
                    return Err(err);
                }

                tracing::error!(parent: &self.logger, action = action.name(), error = %err, "failed-to-run-action");
                self.delegate.failed(&self.logger, &err);
                return Err(err);
            }

            self.delegate.action_completed(&self.logger, action.as_ref());

            if !action.exit_status().success() {
                succeeded = false;
            }
        }

        self.succeeded = succeeded;
        self.state = StepState::Completed { succeeded };
        Ok(())
    }

    /// `true` when the last clean run saw every action exit 0.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn repository(&self) -> &ArtifactRepository {
        &self.repository
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[async_trait]
impl Step for ActionsStep {
    async fn run(&mut self, ctx: &ExecContext) -> Result<()> {
        ActionsStep::run(self, ctx).await
    }

    fn succeeded(&self) -> bool {
        ActionsStep::succeeded(self)
    }
}

impl StepFactory for ActionsStep {
    fn using(&self, repository: ArtifactRepository) -> Box<dyn Step> {
        Box::new(ActionsStep::using(self, repository))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
