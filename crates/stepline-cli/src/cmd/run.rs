use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use stepline_core::{Action, ActionsStep, ArtifactRepository, ContextError, ExecContext};

use crate::command::CommandAction;
use crate::events::{BuildEvent, ConsoleDelegate, OutputFormat};
use crate::output::print_warnings;
use crate::pipeline::Pipeline;

pub const EXIT_SUCCEEDED: i32 = 0;
pub const EXIT_ACTION_FAILED: i32 = 1;
pub const EXIT_ERRORED: i32 = 2;
pub const EXIT_DEADLINE: i32 = 124;
pub const EXIT_CANCELED: i32 = 130;

pub struct RunArgs<'a> {
    pub file: &'a Path,
    pub workdir: Option<&'a Path>,
    pub timeout: Option<u64>,
    pub format: OutputFormat,
}

/// Load, validate and execute a pipeline file. Returns the process exit code.
pub fn run(args: RunArgs<'_>) -> anyhow::Result<i32> {
    let pipeline = Pipeline::load(args.file)?;

    let warnings = pipeline.validate();
    print_warnings(&warnings);
    if Pipeline::has_errors(&warnings) {
        bail!("pipeline '{}' has configuration errors", pipeline.name);
    }

    let workdir = match args.workdir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    if !workdir.is_dir() {
        bail!("work dir {} does not exist", workdir.display());
    }

    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(execute(
        pipeline,
        workdir,
        args.timeout.map(Duration::from_secs),
        args.format,
    )))
}

async fn execute(
    pipeline: Pipeline,
    workdir: PathBuf,
    timeout: Option<Duration>,
    format: OutputFormat,
) -> i32 {
    let span = tracing::info_span!("step", pipeline = %pipeline.name);
    let actions: Vec<Arc<dyn Action>> = pipeline
        .actions
        .iter()
        .cloned()
        .map(|spec| Arc::new(CommandAction::new(spec, &workdir)) as Arc<dyn Action>)
        .collect();
    let delegate = Arc::new(ConsoleDelegate::new(format, std::io::stdout()));
    let mut step =
        ActionsStep::new(span, actions, delegate.clone()).using(ArtifactRepository::new());

    let root = ExecContext::new();
    let ctx = match timeout {
        Some(timeout) => root.with_timeout(timeout),
        None => root.child(),
    };

    let interrupt = root.clone();
    let signals = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            interrupt.cancel();
        }
    });

    let result = step.run(&ctx).await;
    signals.abort();

    let succeeded = result.is_ok() && step.succeeded();
    delegate.emit(&BuildEvent::Finished {
        pipeline: &pipeline.name,
        succeeded,
        time: Utc::now(),
    });

    match result {
        Ok(()) if succeeded => EXIT_SUCCEEDED,
        Ok(()) => EXIT_ACTION_FAILED,
        Err(err) => match err.context_error() {
            Some(ContextError::DeadlineExceeded) => EXIT_DEADLINE,
            Some(ContextError::Canceled) => EXIT_CANCELED,
            None => EXIT_ERRORED,
        },
    }
}
