//! Error taxonomy for the orchestrator.
//!
//! Each component owns a small enum so callers can tell a startup failure
//! from a per-book failure without string matching. The CLI folds them all
//! into `anyhow` at the top.
use crate::stage::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration layering and typed lookup failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value for `{key}`: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

/// Missing inputs detected before any stage runs.
#[derive(Debug, Error)]
pub enum PrereqError {
    #[error("required script not found: {name}")]
    MissingScript { name: String },

    #[error("{} not found - please create it from headers.example.json", .path.display())]
    MissingHeaders { path: PathBuf },

    #[error("fonts directory not found: {}", .path.display())]
    MissingFontsDir { path: PathBuf },

    #[error("no TTF font files found in {}", .path.display())]
    NoFontFiles { path: PathBuf },

    #[error("inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A stage that could not be started, exited badly, or left no artifact.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("interpreter `{interpreter}` not found on PATH: {source}")]
    InterpreterNotFound {
        interpreter: String,
        #[source]
        source: which::Error,
    },

    #[error("interpreter command is empty or unparsable: {command:?}")]
    InvalidInterpreter { command: String },

    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {}", exit_code_label(.code))]
    ExitFailure {
        stage: Stage,
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("{} failed - {detail}", .stage.label())]
    ArtifactMissing { stage: Stage, detail: String },
}

impl StageError {
    /// Captured streams for failures that have them.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            StageError::ExitFailure { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

/// Failure of one book's pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("output file already exists: {} (pass --overwrite to replace it)", .path.display())]
    OutputExists { path: PathBuf },

    #[error("move {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal batch-level failures; per-book failures are recorded, not raised.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("book list file not found: {}", .path.display())]
    ListNotFound { path: PathBuf },

    #[error("no ASINs found in {}", .path.display())]
    NoIdentifiers { path: PathBuf },

    #[error("read book list {}: {source}", .path.display())]
    ReadList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write batch report {}: {source}", .path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize batch report: {0}")]
    Serialize(#[from] serde_json::Error),
}
