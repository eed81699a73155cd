//! System model editor CLI.
//!
//! Provides the `sysmodel` binary. `replay` runs a JSON edit script through
//! the same editor session a UI would drive and prints a JSON summary.
//!
//! Reads configuration from environment variables:
//! - `SYSMODEL_HISTORY_CAPACITY`: undo/redo depth (default: 1000)
//! - `SYSMODEL_SELECTION_HISTORY_CAPACITY`: selection snapshots kept (default: 2000)

mod script;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use sysmodel_edit::EditorConfig;

/// System model editing tools.
#[derive(Parser)]
#[command(name = "sysmodel", about = "System model editing tools")]
struct Cli {
    /// Log every command outcome.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an edit script against a fresh model.
    Replay {
        /// Path to the JSON script.
        script: PathBuf,

        /// Undo/redo depth, overriding the environment.
        #[arg(long)]
        history_capacity: Option<usize>,

        /// Include the final model in the summary.
        #[arg(long)]
        dump_model: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            script,
            history_capacity,
            dump_model,
        } => process::exit(run_replay(script, history_capacity, dump_model)),
    }
}

/// Execute the replay subcommand.
///
/// Returns exit code: 0 = success, 1 = a step failed hard or the final
/// model is inconsistent, 3 = the script could not be read or parsed.
fn run_replay(path: PathBuf, history_capacity: Option<usize>, dump_model: bool) -> i32 {
    let mut config = EditorConfig::from_env();
    if let Some(capacity) = history_capacity.filter(|c| *c > 0) {
        config.history_capacity = capacity;
    }

    let script = match script::load(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    tracing::info!(
        "replaying {} step(s) from {} with history capacity {}",
        script.steps.len(),
        path.display(),
        config.history_capacity
    );
    let summary = script::replay(script, &config, dump_model);

    let json = serde_json::to_string_pretty(&summary)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize summary: {}\"}}", e));
    println!("{}", json);

    if summary.has_failures() {
        1
    } else {
        0
    }
}
