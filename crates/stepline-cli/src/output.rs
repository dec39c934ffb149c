use serde::Serialize;

use crate::pipeline::{ConfigWarning, WarnLevel};

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Warnings go to stderr so they never mix with build events on stdout.
pub fn print_warnings(warnings: &[ConfigWarning]) {
    for w in warnings {
        let tag = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        eprintln!("{tag}: {}", w.message);
    }
}
