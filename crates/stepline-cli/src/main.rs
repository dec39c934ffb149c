mod cmd;
mod command;
mod events;
mod output;
mod pipeline;

use clap::{ArgAction, Parser, Subcommand};
use events::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stepline",
    about = "Run a pipeline step of ordered shell actions from a YAML file",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log verbosity on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every action in order and report build events on stdout
    Run {
        /// Pipeline file (YAML)
        file: PathBuf,

        /// Directory the actions run in (default: current directory)
        #[arg(long, env = "STEPLINE_WORKDIR")]
        workdir: Option<PathBuf>,

        /// Cancel the run after this many seconds
        #[arg(long, env = "STEPLINE_TIMEOUT")]
        timeout: Option<u64>,

        /// Event output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a pipeline file for mistakes without running it
    Validate {
        /// Pipeline file (YAML)
        file: PathBuf,

        /// Output warnings as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    // RUST_LOG, when set, replaces the -v level entirely.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            file,
            workdir,
            timeout,
            format,
        } => cmd::run::run(cmd::run::RunArgs {
            file: &file,
            workdir: workdir.as_deref(),
            timeout,
            format,
        }),
        Commands::Validate { file, json } => cmd::validate::run(&file, json),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(cmd::run::EXIT_ERRORED);
        }
    }
}
