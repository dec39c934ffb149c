use std::path::Path;

use crate::output::{print_json, print_warnings};
use crate::pipeline::Pipeline;

/// Returns the process exit code: 1 if any warning is an error.
pub fn run(file: &Path, json: bool) -> anyhow::Result<i32> {
    let pipeline = Pipeline::load(file)?;
    let warnings = pipeline.validate();

    if json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!(
            "pipeline '{}' is valid ({} actions)",
            pipeline.name,
            pipeline.actions.len()
        );
    } else {
        print_warnings(&warnings);
    }

    Ok(if Pipeline::has_errors(&warnings) { 1 } else { 0 })
}
