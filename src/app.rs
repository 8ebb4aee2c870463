//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the config
//! - dispatches to the portal pipeline, the monitor, or the editor
//! - prints tables and writes CSV snapshots

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Cli, Command, EditArgs, GpaArgs, GradesArgs, PlanArgs, WatchArgs};
use crate::config::Config;
use crate::domain::RetrievalResult;
use crate::error::AppError;
use crate::io::snapshot::{SNAPSHOT_NUMERIC_FIELDS, load_table, save_table};
use crate::report::{aggregate_gpa, format_gpa_report, format_grades, format_plan};

pub mod pipeline;
pub mod watch;

pub const DEFAULT_EDIT_OUTPUT: &str = "DIY_Grade.csv";

/// Entry point for the `neu` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.log_level.as_deref(), cli.log_file.as_deref())?;

    // Offline commands work without a config file.
    let config = if !cli.command.needs_portal() && !cli.config.exists() {
        tracing::debug!(path = %cli.config.display(), "no config file; using defaults");
        Config::default()
    } else {
        Config::load(&cli.config)?
    };
    match cli.command {
        Command::Grades(args) => handle_grades(&config, args),
        Command::Plan(args) => handle_plan(&config, args),
        Command::Watch(args) => handle_watch(&config, args),
        Command::Gpa(args) => handle_gpa(&config, args),
        Command::Edit(args) => handle_edit(&config, args),
    }
}

fn handle_grades(config: &Config, args: GradesArgs) -> Result<(), AppError> {
    let settings = pipeline::PortalSettings::from_config(config)?;
    let result = pipeline::fetch_grades(&settings)?;
    save_unless_empty(&config.grades_path(), &result)?;

    if args.json {
        print_json(&result)?;
    } else {
        println!("{}", format_grades(&result, aggregate_gpa(&result.courses)));
    }
    Ok(())
}

fn handle_plan(config: &Config, args: PlanArgs) -> Result<(), AppError> {
    let mut settings = pipeline::PortalSettings::from_config(config)?;
    if let Some(plan_id) = args.plan_id {
        settings.plan_id = plan_id;
    }
    let result = pipeline::fetch_plan(&settings)?;
    save_unless_empty(&config.plan_path(), &result)?;

    if args.json {
        print_json(&result)?;
    } else {
        println!("{}", format_plan(&result));
    }
    Ok(())
}

/// Write `result` to `path`, leaving an existing file alone when the fetch
/// came back without rows. Returns whether the file was written.
fn save_unless_empty(path: &Path, result: &RetrievalResult) -> Result<bool, AppError> {
    if result.courses.is_empty() && path.exists() {
        tracing::warn!(path = %path.display(), "fetch returned no rows; keeping saved table");
        return Ok(false);
    }
    save_table(path, &result.headers, &result.courses)?;
    Ok(true)
}

fn handle_watch(config: &Config, args: WatchArgs) -> Result<(), AppError> {
    let watcher = watch::Watcher::from_config(config)?;
    if args.once {
        watcher.check_once().map(|_| ())
    } else {
        watcher.run()
    }
}

fn handle_gpa(config: &Config, args: GpaArgs) -> Result<(), AppError> {
    let path = args.file.unwrap_or_else(|| config.grades_path());
    let (_, courses) = load_table(&path, SNAPSHOT_NUMERIC_FIELDS)?;
    println!("{}", format_gpa_report(&courses, aggregate_gpa(&courses)));
    Ok(())
}

fn handle_edit(config: &Config, args: EditArgs) -> Result<(), AppError> {
    let paths = crate::tui::EditorPaths {
        grades: args.file.unwrap_or_else(|| config.grades_path()),
        plan: args.plan.unwrap_or_else(|| config.plan_path()),
        output: args
            .out
            .unwrap_or_else(|| edit_output_default(config)),
    };
    crate::tui::run(paths)
}

fn edit_output_default(config: &Config) -> PathBuf {
    config.output_dir().join(DEFAULT_EDIT_OUTPUT)
}

fn print_json(result: &RetrievalResult) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(result)
        .map_err(|e| AppError::new(4, format!("Failed to serialize result: {e}")))?;
    println!("{text}");
    Ok(())
}
