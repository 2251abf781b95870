//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one load cycle over a hierarchy to verify `robant_core` linkage.
//! - Print validation failures in a stable, greppable format.

use clap::Parser;
use log::error;
use robant_core::config::LoggingConfig;
use robant_core::{init_logging, SearchQuery, TaskSelection, WorkspaceService};
use std::path::PathBuf;
use std::process::ExitCode;

/// Robant hierarchy checker.
#[derive(Parser)]
#[command(name = "robant")]
#[command(about = "Validate and query a Robant note hierarchy")]
#[command(version)]
struct Cli {
    /// Hierarchy root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Absolute directory for `robant.log` (stderr when absent)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level override
    #[arg(long)]
    log_level: Option<String>,

    /// Report metadata fields no schema declares
    #[arg(long)]
    strict: bool,

    /// Search terms to run against the index
    #[arg(long)]
    search: Option<String>,

    /// Only consider tasks with this tag for the next-task pick
    #[arg(long)]
    tag: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut service = match WorkspaceService::open(&cli.root) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("robant: {err}");
            return ExitCode::FAILURE;
        }
    };

    let logging = LoggingConfig {
        level: cli.log_level.clone().unwrap_or_else(|| {
            if cli.log_dir.is_some() || service.config().logging.dir.is_some() {
                service.config().logging.level.clone()
            } else {
                "warn".to_string()
            }
        }),
        dir: cli
            .log_dir
            .clone()
            .or_else(|| service.config().logging.dir.clone()),
    };
    if let Err(message) = init_logging(&logging) {
        eprintln!("robant: logging disabled: {message}");
    }

    if cli.strict {
        let mut config = service.config().clone();
        config.validation.strict_fields = true;
        service = WorkspaceService::new(
            service.root().to_path_buf(),
            config,
            std::sync::Arc::new(service.schema().clone()),
        );
    }

    let snapshot = match service.reload() {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("event=cli_reload module=cli status=error error={err}");
            eprintln!("robant: {err}");
            return ExitCode::FAILURE;
        }
    };

    for failure in &snapshot.report.errors {
        println!("Failed validation: {}: {}", failure.location(), failure.message);
    }
    for issue in &snapshot.report.integration {
        println!("Integration issue: {issue}");
    }
    println!(
        "Indexed {} notes ({} resources) with {} errors",
        snapshot.index.len(),
        snapshot.report.resources_loaded,
        snapshot.report.errors.len()
    );

    if let Some(text) = &cli.search {
        for hit in robant_core::search(&snapshot.index, &SearchQuery::new().text(text.as_str())) {
            println!(
                "{}\t{}\t{}",
                hit.score,
                hit.note.id,
                hit.note.title.as_deref().unwrap_or("")
            );
        }
    }

    let mut selection = TaskSelection::default();
    if let Some(tag) = &cli.tag {
        selection = selection.with_tag(tag.as_str());
    }
    match robant_core::select_next_task(&snapshot.index, &selection) {
        Some(task) => println!(
            "Next task: {} [{}] {}",
            task.id,
            task.priority,
            task.title.as_deref().unwrap_or("")
        ),
        None => println!("Next task: none"),
    }

    if snapshot.report.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
