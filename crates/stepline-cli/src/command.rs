use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use stepline_core::{
    Action, Artifact, ArtifactRepository, ExecContext, ExitStatus, Result, SourceName, StepError,
};
use tokio::process::{Child, Command};
use tracing::Span;

use crate::pipeline::ActionSpec;

/// Exit status recorded when the child was killed by a signal.
const SIGNALED: i32 = -1;

// ─── CommandAction ────────────────────────────────────────────────────────

/// Runs one [`ActionSpec`] as `sh -c <run>` inside the work dir.
///
/// Each declared input is exposed to the child as
/// `STEPLINE_INPUT_<NAME>=<artifact path>`. The child's stdout and stderr both
/// go to our stderr so stdout stays reserved for build events.
///
/// On unix the shell leads its own process group, and the whole group is
/// killed when the context ends.
pub struct CommandAction {
    spec: ActionSpec,
    workdir: PathBuf,
    exit_status: AtomicI32,
}

impl CommandAction {
    pub fn new(spec: ActionSpec, workdir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            workdir: workdir.into(),
            exit_status: AtomicI32::new(0),
        }
    }

    fn command(&self, repository: &ArtifactRepository) -> Result<Command> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.spec.run)
            .current_dir(&self.workdir)
            .envs(&self.spec.env)
            .stdin(Stdio::null())
            .stdout(std::io::stderr())
            .stderr(std::io::stderr())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        for input in &self.spec.inputs {
            let artifact = repository
                .source_for(&SourceName::new(input.as_str()))
                .ok_or_else(|| {
                    StepError::Action(format!(
                        "{}: missing input artifact '{input}'",
                        self.spec.name
                    ))
                })?;
            cmd.env(input_env_var(input), artifact.path());
        }

        Ok(cmd)
    }

    /// SIGKILL the child's process group, then reap the child.
    async fn terminate(&self, child: &mut Child, logger: &Span) {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // Negative pid addresses the process group led by the child.
                let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
                if rc != 0 {
                    let e = std::io::Error::last_os_error();
                    tracing::warn!(parent: logger, action = %self.spec.name, error = %e, "failed to kill process group");
                }
            }
        }

        if let Err(e) = child.kill().await {
            tracing::warn!(parent: logger, action = %self.spec.name, error = %e, "failed to kill child");
        }
    }
}

#[async_trait]
impl Action for CommandAction {
    async fn run(
        &self,
        ctx: &ExecContext,
        logger: &Span,
        repository: &ArtifactRepository,
    ) -> Result<()> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        let mut child = self.command(repository)?.spawn()?;
        tracing::info!(parent: logger, action = %self.spec.name, pid = ?child.id(), "spawned");

        let outcome = tokio::select! {
            status = child.wait() => Ok(status),
            reason = ctx.done() => Err(reason),
        };

        let status = match outcome {
            Ok(status) => status?,
            Err(reason) => {
                self.terminate(&mut child, logger).await;
                return Err(reason.into());
            }
        };

        let code = status.code().unwrap_or(SIGNALED);
        self.exit_status.store(code, Ordering::SeqCst);
        tracing::info!(parent: logger, action = %self.spec.name, exit_status = code, "exited");

        if let Some(output) = self.spec.produces.as_deref().filter(|_| status.success()) {
            repository.register_source(output, Artifact::new(&self.workdir));
        }

        Ok(())
    }

    fn exit_status(&self) -> ExitStatus {
        ExitStatus::from(self.exit_status.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        &self.spec.name
    }
}

/// `build-output` → `STEPLINE_INPUT_BUILD_OUTPUT`
pub fn input_env_var(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("STEPLINE_INPUT_{suffix}")
}

// ─── Tests ────────────────────────────────────────────────────────────────
