use std::fmt;

use async_trait::async_trait;
use tracing::Span;

use crate::context::ExecContext;
use crate::repository::ArtifactRepository;
use crate::Result;

/// Exit status reported by an action after it ran. Zero means success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExitStatus(i32);

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus(0);

    pub fn success(self) -> bool {
        self.0 == 0
    }

    pub fn code(self) -> i32 {
        self.0
    }
}

impl From<i32> for ExitStatus {
    fn from(code: i32) -> Self {
        ExitStatus(code)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work inside a step: run a command, fetch a resource, etc.
///
/// `run` returns `Ok(())` whenever the work ran to completion, even if it
/// "failed" in the domain sense; that outcome is reported through
/// [`exit_status`](Action::exit_status). `Err` is reserved for hard failures
/// such as I/O faults or the context ending. An action that gives up because
/// `ctx` ended should return the [`ContextError`](crate::ContextError) from
/// `ctx.err()` / `ctx.done()` so it is classified as an interruption.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(
        &self,
        ctx: &ExecContext,
        logger: &Span,
        repository: &ArtifactRepository,
    ) -> Result<()>;

    /// Only meaningful after `run` returned `Ok`.
    fn exit_status(&self) -> ExitStatus;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
