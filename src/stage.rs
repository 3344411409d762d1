//! The three external stages and the contract for trusting their results.
//!
//! A stage counts as done only when its process exited cleanly *and* the
//! artifact it promises is on disk. [`StageResult::verify`] is the single
//! place that decides this.
mod script;

use crate::config::DecodeMode;
use crate::error::StageError;
use crate::paths::{BookPaths, Workspace};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use script::ScriptRunner;

pub const DOWNLOAD_SCRIPT: &str = "download_full_book.py";
pub const DECODE_SCRIPT: &str = "decode_glyphs_complete.py";
pub const PACKAGE_SCRIPT: &str = "create_epub.py";

/// Scripts that must exist in the working directory, in stage order.
pub const STAGE_SCRIPTS: [&str; 3] = [DOWNLOAD_SCRIPT, DECODE_SCRIPT, PACKAGE_SCRIPT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Decode,
    Package,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Download => "Download Book",
            Stage::Decode => "Decode Glyphs",
            Stage::Package => "Create EPUB",
        }
    }

    pub fn script(self) -> &'static str {
        match self {
            Stage::Download => DOWNLOAD_SCRIPT,
            Stage::Decode => DECODE_SCRIPT,
            Stage::Package => PACKAGE_SCRIPT,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a stage process did, captured in full.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub command: String,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl StageOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Port to the external stages. One method per stage so in-process
/// implementations can stand in for the scripts.
pub trait StageRunner {
    fn download(&self, asin: &str, auto_confirm: bool) -> Result<StageOutput, StageError>;
    fn decode(&self, book_dir: &Path, mode: DecodeMode) -> Result<StageOutput, StageError>;
    fn package(&self, book_dir: &Path) -> Result<StageOutput, StageError>;
}

/// Artifact a stage must leave behind.
#[derive(Debug, Clone)]
pub enum Postcondition {
    /// The book directory exists and holds at least one `batch_*` directory.
    BatchDirs(BookPaths),
    /// A fixed-name file exists.
    File { path: PathBuf, missing: &'static str },
}

impl Postcondition {
    pub fn for_stage(stage: Stage, workspace: &Workspace, book: &BookPaths) -> Self {
        match stage {
            Stage::Download => Postcondition::BatchDirs(book.clone()),
            Stage::Decode => Postcondition::File {
                path: workspace.mapping_path(),
                missing: "character mapping file not created",
            },
            Stage::Package => Postcondition::File {
                path: workspace.epub_path(),
                missing: "output file not found",
            },
        }
    }

    /// Check the artifact, returning a one-line description of what was found.
    pub fn check(&self, stage: Stage) -> Result<String, StageError> {
        let missing = |detail: String| StageError::ArtifactMissing { stage, detail };
        match self {
            Postcondition::BatchDirs(book) => {
                if !book.dir().is_dir() {
                    return Err(missing(format!(
                        "book directory not created: {}",
                        book.relative().display()
                    )));
                }
                let batches = book.batch_dirs().len();
                if batches == 0 {
                    return Err(missing("no batch directories found".to_string()));
                }
                Ok(format!(
                    "Downloaded {batches} batches to {}",
                    book.relative().display()
                ))
            }
            Postcondition::File { path, missing: detail } => {
                if !path.is_file() {
                    return Err(missing(detail.to_string()));
                }
                Ok(format!("Created {}", path.display()))
            }
        }
    }
}

/// Process outcome paired with the artifact check for the same stage.
#[derive(Debug)]
pub struct StageResult {
    pub stage: Stage,
    pub output: StageOutput,
    pub postcondition: Postcondition,
}

/// A stage that passed both checks.
#[derive(Debug)]
pub struct VerifiedStage {
    pub stage: Stage,
    pub output: StageOutput,
    pub note: String,
}

impl StageResult {
    /// Exit status first, then the artifact. Exit 0 alone is not enough.
    pub fn verify(self) -> Result<VerifiedStage, StageError> {
        if !self.output.success() {
            return Err(StageError::ExitFailure {
                stage: self.stage,
                command: self.output.command,
                code: self.output.code,
                stdout: self.output.stdout,
                stderr: self.output.stderr,
            });
        }
        let note = self.postcondition.check(self.stage)?;
        Ok(VerifiedStage {
            stage: self.stage,
            output: self.output,
            note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn output(code: Option<i32>) -> StageOutput {
        StageOutput {
            command: "sh decode_glyphs_complete.py downloads/B0".to_string(),
            code,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn non_zero_exit_fails_even_with_artifact() {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path().to_path_buf());
        fs::write(workspace.mapping_path(), "{}").expect("mapping");
        let book = workspace.book(Path::new("downloads"), "B0");
        let result = StageResult {
            stage: Stage::Decode,
            output: output(Some(2)),
            postcondition: Postcondition::for_stage(Stage::Decode, &workspace, &book),
        };
        match result.verify() {
            Err(StageError::ExitFailure { code, stderr, .. }) => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr, "err");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
    }

    #[test]
    fn zero_exit_without_artifact_fails() {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path().to_path_buf());
        let book = workspace.book(Path::new("downloads"), "B0");
        let result = StageResult {
            stage: Stage::Package,
            output: output(Some(0)),
            postcondition: Postcondition::for_stage(Stage::Package, &workspace, &book),
        };
        assert!(matches!(
            result.verify(),
            Err(StageError::ArtifactMissing { stage: Stage::Package, .. })
        ));
    }

    #[test]
    fn download_needs_book_dir_and_a_batch() {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path().to_path_buf());
        let book = workspace.book(Path::new("downloads"), "B0");
        let check = Postcondition::for_stage(Stage::Download, &workspace, &book);

        let err = check.check(Stage::Download).expect_err("no book dir");
        assert!(err.to_string().contains("book directory not created"));

        fs::create_dir_all(book.dir()).expect("book dir");
        let err = check.check(Stage::Download).expect_err("no batches");
        assert!(err.to_string().contains("no batch directories found"));

        fs::create_dir_all(book.dir().join("batch_0")).expect("batch");
        fs::create_dir_all(book.dir().join("batch_1")).expect("batch");
        let note = check.check(Stage::Download).expect("batches present");
        assert!(note.starts_with("Downloaded 2 batches"));
    }

    #[test]
    fn verified_stage_keeps_output() {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path().to_path_buf());
        fs::write(workspace.mapping_path(), "{}").expect("mapping");
        let book = workspace.book(Path::new("downloads"), "B0");
        let verified = StageResult {
            stage: Stage::Decode,
            output: output(Some(0)),
            postcondition: Postcondition::for_stage(Stage::Decode, &workspace, &book),
        }
        .verify()
        .expect("verified");
        assert_eq!(verified.stage, Stage::Decode);
        assert_eq!(verified.output.stdout, "out");
    }
}
