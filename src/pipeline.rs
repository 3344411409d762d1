//! Single-book pipeline: download, decode, package.
//!
//! Stages run in order and only if enabled. The first failure runs cleanup
//! and aborts the book; there is no partial success.
mod output;

use crate::cleanup::cleanup_on_failure;
use crate::config::Config;
use crate::error::{PipelineError, StageError};
use crate::paths::{BookPaths, Workspace};
use crate::stage::{Postcondition, Stage, StageResult, StageRunner};
use crate::util::{display_path, format_elapsed, print_banner, truncate_string};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use output::{output_file_name, place_epub, resolve_title};

const STDERR_LOG_BYTES: usize = 512;

/// Stages enabled by `config`, in execution order.
pub fn planned_stages(config: &Config) -> Vec<Stage> {
    [
        (Stage::Download, config.download.enabled),
        (Stage::Decode, config.decode.enabled),
        (Stage::Package, config.epub.enabled),
    ]
    .into_iter()
    .filter_map(|(stage, enabled)| enabled.then_some(stage))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// A book that made it through every enabled stage.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub steps: Vec<StepTiming>,
    /// Final EPUB location when the package stage ran.
    pub epub: Option<PathBuf>,
    pub total: Duration,
}

pub struct BookProcessor<'a> {
    asin: &'a str,
    config: &'a Config,
    workspace: &'a Workspace,
    runner: &'a dyn StageRunner,
    book: BookPaths,
}

impl<'a> BookProcessor<'a> {
    pub fn new(
        asin: &'a str,
        config: &'a Config,
        workspace: &'a Workspace,
        runner: &'a dyn StageRunner,
    ) -> Self {
        let book = workspace.book(&config.downloads_dir, asin);
        Self {
            asin,
            config,
            workspace,
            runner,
            book,
        }
    }

    pub fn run_pipeline(&self) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        print_banner('=', 80, &format!("PROCESSING KINDLE BOOK: {}", self.asin));
        println!(
            "Start time: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let stages = planned_stages(self.config);
        let mut steps = Vec::with_capacity(stages.len());
        let mut epub = None;
        for (index, stage) in stages.iter().copied().enumerate() {
            print_banner(
                '=',
                60,
                &format!("STEP {}/{}: {}", index + 1, stages.len(), stage.label()),
            );
            let step_start = Instant::now();
            match self.run_stage(stage) {
                Ok(placed) => {
                    let elapsed = step_start.elapsed();
                    println!(
                        "{} completed successfully in {}",
                        stage.label(),
                        format_elapsed(elapsed)
                    );
                    tracing::info!(
                        asin = self.asin,
                        stage = stage.label(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "stage complete"
                    );
                    if placed.is_some() {
                        epub = placed;
                    }
                    steps.push(StepTiming { stage, elapsed });
                }
                Err(err) => {
                    self.report_failure(stage, &err);
                    self.cleanup();
                    return Err(err);
                }
            }
        }

        let total = start.elapsed();
        print_banner('=', 80, "PIPELINE COMPLETED SUCCESSFULLY");
        println!("Book: {}", self.asin);
        println!("Total time: {}", format_elapsed(total));
        println!("Output directory: {}", self.book.relative().display());
        if let Some(path) = &epub {
            println!(
                "EPUB file: {}",
                display_path(path, Some(self.workspace.root()))
            );
        }
        Ok(PipelineOutcome { steps, epub, total })
    }

    /// Run one stage and verify it. Returns the placed EPUB for the package stage.
    fn run_stage(&self, stage: Stage) -> Result<Option<PathBuf>, PipelineError> {
        let output = match stage {
            Stage::Download => self
                .runner
                .download(self.asin, self.config.download.auto_confirm)?,
            Stage::Decode => self
                .runner
                .decode(self.book.relative(), self.config.decode.mode)?,
            Stage::Package => self.runner.package(self.book.relative())?,
        };
        if output.success() {
            println!("{} output:", stage.label());
            println!("{}", output.stdout);
        }

        let verified = StageResult {
            stage,
            output,
            postcondition: Postcondition::for_stage(stage, self.workspace, &self.book),
        }
        .verify()?;
        println!("{}", verified.note);
        tracing::debug!(
            stage = verified.stage.label(),
            process_ms = verified.output.duration.as_millis() as u64,
            note = %verified.note,
            "stage verified"
        );

        if stage != Stage::Package {
            return Ok(None);
        }
        let placed = self.place_output()?;
        println!(
            "EPUB created: {}",
            display_path(&placed, Some(self.workspace.root()))
        );
        Ok(Some(placed))
    }

    fn place_output(&self) -> Result<PathBuf, PipelineError> {
        let epub = &self.config.epub;
        let title = resolve_title(&self.book, self.asin, epub.include_metadata);
        let file_name = output_file_name(&epub.output_name, self.asin, &title);
        tracing::debug!(asin = self.asin, %title, %file_name, "naming EPUB");
        place_epub(self.workspace, &file_name, epub.overwrite)
    }

    fn report_failure(&self, stage: Stage, err: &PipelineError) {
        match err {
            PipelineError::Stage(stage_err @ StageError::ExitFailure { command, code, .. }) => {
                match code {
                    Some(code) => println!("{} failed with exit code {code}", stage.label()),
                    None => println!("{} terminated by signal", stage.label()),
                }
                println!("Command: {command}");
                if let Some((stdout, stderr)) = stage_err.captured_output() {
                    if !stdout.is_empty() {
                        println!("Output: {stdout}");
                    }
                    if !stderr.is_empty() {
                        println!("Error: {stderr}");
                    }
                    tracing::error!(
                        asin = self.asin,
                        stage = stage.label(),
                        exit_code = *code,
                        stderr = %truncate_string(stderr, STDERR_LOG_BYTES),
                        "stage process failed"
                    );
                }
            }
            other => {
                println!("{} failed: {other}", stage.label());
                tracing::error!(asin = self.asin, stage = stage.label(), error = %other, "stage failed");
            }
        }
    }

    fn cleanup(&self) {
        println!("\nCleaning up partial files...");
        for action in cleanup_on_failure(self.workspace, &self.book) {
            println!("  {action}");
        }
    }
}
