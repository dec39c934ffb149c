use std::io::Write;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use stepline_core::{Action, BuildEventsDelegate, StepError};
use tracing::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// BuildEvent
// ---------------------------------------------------------------------------

/// One line of build output.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent<'a> {
    ActionCompleted {
        action: &'a str,
        exit_status: i32,
        time: DateTime<Utc>,
    },
    Failed {
        error: String,
        time: DateTime<Utc>,
    },
    Finished {
        pipeline: &'a str,
        succeeded: bool,
        time: DateTime<Utc>,
    },
}

impl BuildEvent<'_> {
    fn render_text(&self) -> String {
        match self {
            BuildEvent::ActionCompleted {
                action,
                exit_status: 0,
                ..
            } => format!("ok    {action}"),
            BuildEvent::ActionCompleted {
                action,
                exit_status,
                ..
            } => format!("FAIL  {action} (exit {exit_status})"),
            BuildEvent::Failed { error, .. } => format!("error: {error}"),
            BuildEvent::Finished {
                pipeline,
                succeeded: true,
                ..
            } => format!("{pipeline}: succeeded"),
            BuildEvent::Finished { pipeline, .. } => format!("{pipeline}: failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsoleDelegate
// ---------------------------------------------------------------------------

/// Writes build events to `out` as text lines or JSON lines.
pub struct ConsoleDelegate<W> {
    format: OutputFormat,
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleDelegate<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            out: Mutex::new(out),
        }
    }

    pub fn emit(&self, event: &BuildEvent<'_>) {
        let line = match self.format {
            OutputFormat::Text => event.render_text(),
            OutputFormat::Json => match serde_json::to_string(event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize build event");
                    return;
                }
            },
        };

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "failed to write build event");
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> BuildEventsDelegate for ConsoleDelegate<W> {
    fn action_completed(&self, logger: &Span, action: &dyn Action) {
        let exit_status = action.exit_status().code();
        tracing::debug!(parent: logger, action = action.name(), exit_status, "action-completed");
        self.emit(&BuildEvent::ActionCompleted {
            action: action.name(),
            exit_status,
            time: Utc::now(),
        });
    }

    fn failed(&self, logger: &Span, err: &StepError) {
        tracing::debug!(parent: logger, error = %err, "step-failed");
        self.emit(&BuildEvent::Failed {
            error: err.to_string(),
            time: Utc::now(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stepline_core::{ArtifactRepository, ExecContext, ExitStatus};

    struct Stub(i32);

    #[async_trait]
    impl Action for Stub {
        async fn run(
            &self,
            _ctx: &ExecContext,
            _logger: &Span,
            _repository: &ArtifactRepository,
        ) -> stepline_core::Result<()> {
            Ok(())
        }

        fn exit_status(&self) -> ExitStatus {
            ExitStatus::from(self.0)
        }

        fn name(&self) -> &str {
            "compile"
        }
    }

    fn lines(delegate: ConsoleDelegate<Vec<u8>>) -> Vec<String> {
        String::from_utf8(delegate.into_inner())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn text_events() {
        let d = ConsoleDelegate::new(OutputFormat::Text, Vec::new());
        d.action_completed(&Span::none(), &Stub(0));
        d.action_completed(&Span::none(), &Stub(2));
        d.failed(&Span::none(), &StepError::Interrupted);

        assert_eq!(
            lines(d),
            vec!["ok    compile", "FAIL  compile (exit 2)", "error: interrupted"]
        );
    }

    #[test]
    fn json_events_are_tagged() {
        let d = ConsoleDelegate::new(OutputFormat::Json, Vec::new());
        d.action_completed(&Span::none(), &Stub(1));
        d.failed(&Span::none(), &StepError::Action("boom".into()));

        let out = lines(d);
        let completed: serde_json::Value = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(completed["event"], "action_completed");
        assert_eq!(completed["action"], "compile");
        assert_eq!(completed["exit_status"], 1);
        assert!(completed["time"].is_string());

        let failed: serde_json::Value = serde_json::from_str(&out[1]).unwrap();
        assert_eq!(failed["event"], "failed");
        assert_eq!(failed["error"], "action failed: boom");
    }

    #[test]
    fn finished_event_text() {
        let d = ConsoleDelegate::new(OutputFormat::Text, Vec::new());
        d.emit(&BuildEvent::Finished {
            pipeline: "build",
            succeeded: false,
            time: Utc::now(),
        });
        assert_eq!(lines(d), vec!["build: failed"]);
    }
}
