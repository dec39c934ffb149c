use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// One shell action in a pipeline file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    /// Shell snippet passed to `sh -c`.
    pub run: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Artifacts that must already be registered before this action runs.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Artifact name to register for the work dir when the action exits 0.
    #[serde(default)]
    pub produces: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A single pipeline step: a named, ordered list of actions.
///
/// ```yaml
/// name: build
/// actions:
///   - name: fetch
///     run: git clone https://example.com/repo.git src
///     produces: source
///   - name: compile
///     run: make -C src
///     inputs: [source]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

impl Pipeline {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline file {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("invalid pipeline file {}", path.display()))
    }

    pub fn parse(data: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// Check for mistakes that would make a run fail or behave unexpectedly.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.name.trim().is_empty() {
            warnings.push(ConfigWarning::error("pipeline name is empty"));
        }
        if self.actions.is_empty() {
            warnings.push(ConfigWarning::warning("pipeline has no actions"));
        }

        let mut names = HashSet::new();
        let mut produced: HashSet<&str> = HashSet::new();
        for (i, action) in self.actions.iter().enumerate() {
            if action.name.trim().is_empty() {
                warnings.push(ConfigWarning::error(format!("action #{} has no name", i + 1)));
            } else if !names.insert(action.name.as_str()) {
                warnings.push(ConfigWarning::error(format!(
                    "duplicate action name '{}'",
                    action.name
                )));
            }

            if action.run.trim().is_empty() {
                warnings.push(ConfigWarning::error(format!(
                    "action '{}' has an empty run command",
                    action.name
                )));
            }

            for input in &action.inputs {
                if !produced.contains(input.as_str()) {
                    warnings.push(ConfigWarning::error(format!(
                        "action '{}' needs artifact '{}' which no earlier action produces",
                        action.name, input
                    )));
                }
            }

            if let Some(output) = &action.produces {
                if !produced.insert(output.as_str()) {
                    warnings.push(ConfigWarning::warning(format!(
                        "action '{}' replaces artifact '{}'",
                        action.name, output
                    )));
                }
            }
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Pipeline {
        Pipeline::parse(yaml).unwrap()
    }

    #[test]
    fn parses_full_action() {
        let p = parse(
            r#"
name: build
actions:
  - name: fetch
    run: echo fetch
    env:
      MODE: fast
    produces: source
  - name: compile
    run: echo compile
    inputs: [source]
"#,
        );
        assert_eq!(p.name, "build");
        assert_eq!(p.actions.len(), 2);
        assert_eq!(p.actions[0].env["MODE"], "fast");
        assert_eq!(p.actions[0].produces.as_deref(), Some("source"));
        assert_eq!(p.actions[1].inputs, vec!["source".to_string()]);
        assert!(p.validate().is_empty());
    }

    #[test]
    fn missing_run_is_a_parse_error() {
        assert!(Pipeline::parse("name: x\nactions:\n  - name: a\n").is_err());
    }

    #[test]
    fn empty_pipeline_is_only_a_warning() {
        let warnings = parse("name: empty\n").validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(!Pipeline::has_errors(&warnings));
    }

    #[test]
    fn duplicate_names_are_errors() {
        let warnings = parse(
            "name: x\nactions:\n  - {name: a, run: 'true'}\n  - {name: a, run: 'true'}\n",
        )
        .validate();
        assert!(Pipeline::has_errors(&warnings));
        assert!(warnings[0].message.contains("duplicate action name 'a'"));
    }

    #[test]
    fn input_must_be_produced_earlier() {
        let warnings = parse(
            r#"
name: x
actions:
  - {name: use, run: 'true', inputs: [out]}
  - {name: make, run: 'true', produces: out}
"#,
        )
        .validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("needs artifact 'out'"));
    }

    #[test]
    fn reproduced_artifact_is_a_warning() {
        let warnings = parse(
            "name: x\nactions:\n  - {name: a, run: 'true', produces: o}\n  - {name: b, run: 'true', produces: o}\n",
        )
        .validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }

    #[test]
    fn blank_run_is_an_error() {
        let warnings = parse("name: x\nactions:\n  - {name: a, run: '  '}\n").validate();
        assert!(Pipeline::has_errors(&warnings));
    }
}
