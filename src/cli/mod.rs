//! Command-line parsing for the `neu` grade tool.
//!
//! Parsing and dispatch stay here and in `app`; portal, extraction and
//! reporting code never sees clap types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "neu", version, about = "NEU academic portal grade monitor")]
pub struct Cli {
    /// JSON config file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log filter (e.g. `info`, `debug`, `neu_grades=trace`). `RUST_LOG` wins.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, fetch the grade history, save it as CSV and print it.
    Grades(GradesArgs),
    /// Log in, fetch the curriculum plan, save it as CSV and print it.
    Plan(PlanArgs),
    /// Poll for grade changes; save and email on change.
    Watch(WatchArgs),
    /// GPA and per-course impact of a saved grade CSV.
    Gpa(GpaArgs),
    /// Interactive grade editor for what-if GPA calculations.
    Edit(EditArgs),
}

impl Command {
    /// Whether the command logs in to the portal.
    pub fn needs_portal(&self) -> bool {
        matches!(self, Command::Grades(_) | Command::Plan(_) | Command::Watch(_))
    }
}

#[derive(Debug, Args, Clone)]
pub struct GradesArgs {
    /// Print the retrieval result as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    /// Plan id (overrides `service_data.plan_id`).
    #[arg(long)]
    pub plan_id: Option<String>,

    /// Print the retrieval result as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    /// Run a single check and exit.
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Args, Clone)]
pub struct GpaArgs {
    /// Grade CSV (defaults to the configured grades file).
    #[arg(long, value_name = "CSV")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EditArgs {
    /// Grade CSV to start from (defaults to the configured grades file).
    #[arg(long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Plan CSV offered when adding courses (defaults to the configured plan file).
    #[arg(long, value_name = "CSV")]
    pub plan: Option<PathBuf>,

    /// Where `s` saves the edited table.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}
