use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::process::ExitCode;

mod batch;
mod cleanup;
mod cli;
mod config;
mod error;
mod logging;
mod paths;
mod pipeline;
mod prereqs;
mod signal;
mod stage;
mod util;

use cli::{RootArgs, Target};
use config::load_config;
use paths::Workspace;
use pipeline::BookProcessor;
use stage::ScriptRunner;
use util::{display_path, print_banner};

fn main() -> ExitCode {
    signal::install_interrupt_handler();
    let args = RootArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\nError: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: RootArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?
        .with_overrides(&args.overrides().to_tree())
        .build()
        .context("build configuration")?;

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(config.tree())?);
        return Ok(());
    }
    let Some(target) = args.target() else {
        anyhow::bail!("an ASIN or --batch <FILE> is required");
    };

    let workspace = Workspace::new(env::current_dir().context("resolve working directory")?);
    logging::init(&config.logging, &workspace)?;
    tracing::debug!(
        root = %workspace.root().display(),
        interpreter = %config.interpreter,
        mode = %config.decode.mode,
        "configuration loaded"
    );

    print_banner('=', 80, "KINDLE BOOK PROCESSOR");
    println!("Checking prerequisites...");
    let report = prereqs::check_prerequisites(&workspace, &config.fonts_dir)?;
    println!(
        "All prerequisites met ({} font files in {})",
        report.font_files,
        config.fonts_dir.display()
    );

    let runner = ScriptRunner::new(&config.interpreter, workspace.clone())?;
    match target {
        Target::Book(asin) => {
            let outcome = BookProcessor::new(&asin, &config, &workspace, &runner)
                .run_pipeline()
                .with_context(|| format!("pipeline failed for {asin}"))?;
            for step in &outcome.steps {
                tracing::info!(
                    stage = step.stage.label(),
                    elapsed_ms = step.elapsed.as_millis() as u64,
                    "step timing"
                );
            }
            tracing::info!(
                %asin,
                total_ms = outcome.total.as_millis() as u64,
                epub = ?outcome.epub.as_deref().map(|path| display_path(path, Some(workspace.root()))),
                "book processed"
            );
        }
        Target::Batch(list) => {
            let list = workspace.resolve(&list);
            let summary = batch::process_batch(&list, &config, &workspace, &runner)?;
            tracing::info!(
                books = summary.records.len(),
                failed = summary.failed().count(),
                "batch processed"
            );
        }
    }
    Ok(())
}
