//! `stepline-core`: runs the actions of a single pipeline step in order.
//!
//! # Architecture
//!
//! ```text
//! ActionsStep::new(logger, actions, delegate)
//!     │
//!     ▼ using(repository)         ← new value, original untouched
//! ActionsStep
//!     │
//!     ▼ run(&ExecContext)
//! Action::run ── Ok ──▶ BuildEventsDelegate::action_completed
//!     │                 exit_status() != 0 → succeeded = false
//!     └──── Err ──▶ BuildEventsDelegate::failed   (context end → "interrupted")
//!                   run stops, error returned
//! ```
//!
//! Concrete actions and delegates live with the caller; see the `stepline`
//! CLI for a shell-command action and a console delegate.

pub mod action;
pub mod context;
pub mod delegate;
pub mod error;
pub mod repository;
pub mod step;

pub use action::{Action, ExitStatus};
pub use context::ExecContext;
pub use delegate::BuildEventsDelegate;
pub use error::{ContextError, Result, StepError};
pub use repository::{Artifact, ArtifactRepository, SourceName};
pub use step::{ActionsStep, Step, StepFactory, StepState};
