//! Sequential batch runs over a list of ASINs.
use crate::config::Config;
use crate::error::BatchError;
use crate::paths::Workspace;
use crate::pipeline::BookProcessor;
use crate::stage::StageRunner;
use crate::util::{display_path, print_banner};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Success,
    Failed,
}

/// One line of the batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRecord {
    pub asin: String,
    pub status: BookStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub records: Vec<BookRecord>,
    pub report_path: PathBuf,
}

impl BatchSummary {
    pub fn succeeded(&self) -> impl Iterator<Item = &BookRecord> {
        self.records
            .iter()
            .filter(|record| record.status == BookStatus::Success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BookRecord> {
        self.records
            .iter()
            .filter(|record| record.status == BookStatus::Failed)
    }
}

/// ASINs from `path`, one per line. Blank lines and `#` comments are skipped.
pub fn read_book_list(path: &Path) -> Result<Vec<String>, BatchError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(BatchError::ListNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(BatchError::ReadList {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let asins = parse_book_list(&text);
    if asins.is_empty() {
        return Err(BatchError::NoIdentifiers {
            path: path.to_path_buf(),
        });
    }
    Ok(asins)
}

fn parse_book_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Run every book in `list_path` through the pipeline, then write the report.
///
/// Book failures are recorded, not returned. With `continue_on_error` off
/// the run stops after the first recorded failure.
pub fn process_batch(
    list_path: &Path,
    config: &Config,
    workspace: &Workspace,
    runner: &dyn StageRunner,
) -> Result<BatchSummary, BatchError> {
    let asins = read_book_list(list_path)?;
    print_banner('=', 80, &format!("BATCH PROCESSING: {} books", asins.len()));
    println!("Book list: {}", display_path(list_path, Some(workspace.root())));
    println!("Books to process: {}", asins.join(", "));
    tracing::info!(
        list = %list_path.display(),
        books = asins.len(),
        continue_on_error = config.continue_on_error,
        "starting batch"
    );

    let mut records = Vec::with_capacity(asins.len());
    for (index, asin) in asins.iter().enumerate() {
        print_banner('#', 80, &format!("BOOK {}/{}: {asin}", index + 1, asins.len()));
        match BookProcessor::new(asin, config, workspace, runner).run_pipeline() {
            Ok(_) => records.push(BookRecord {
                asin: asin.clone(),
                status: BookStatus::Success,
                error: None,
            }),
            Err(err) => {
                println!("\nFailed to process {asin}: {err}");
                tracing::warn!(%asin, error = %err, "book failed");
                records.push(BookRecord {
                    asin: asin.clone(),
                    status: BookStatus::Failed,
                    error: Some(err.to_string()),
                });
                if !config.continue_on_error {
                    println!("Stopping batch processing due to error");
                    break;
                }
            }
        }
    }

    print_summary(&records);

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let report_path = workspace.resolve(Path::new(&format!("batch_report_{timestamp}.json")));
    write_report(&report_path, &records)?;
    println!(
        "\nBatch report saved to: {}",
        display_path(&report_path, Some(workspace.root()))
    );

    let summary = BatchSummary {
        records,
        report_path,
    };
    tracing::info!(
        total = summary.records.len(),
        succeeded = summary.succeeded().count(),
        report = %summary.report_path.display(),
        "batch finished"
    );
    Ok(summary)
}

fn write_report(path: &Path, records: &[BookRecord]) -> Result<(), BatchError> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    fs::write(path, json).map_err(|source| BatchError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}

fn print_summary(records: &[BookRecord]) {
    let (succeeded, failed): (Vec<&BookRecord>, Vec<&BookRecord>) = records
        .iter()
        .partition(|record| record.status == BookStatus::Success);
    print_banner('=', 80, "BATCH PROCESSING SUMMARY");
    println!("Total books: {}", records.len());
    println!("Successful: {}", succeeded.len());
    println!("Failed: {}", failed.len());
    if !succeeded.is_empty() {
        println!("\nSuccessful books:");
        for record in &succeeded {
            println!("  - {}", record.asin);
        }
    }
    if !failed.is_empty() {
        println!("\nFailed books:");
        for record in &failed {
            println!(
                "  - {}: {}",
                record.asin,
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
