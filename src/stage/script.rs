//! Subprocess-backed stages: `<interpreter> <script> <args..>` run inside
//! the workspace with stdout and stderr captured.
use super::{Stage, StageOutput, StageRunner};
use crate::config::DecodeMode;
use crate::error::StageError;
use crate::paths::Workspace;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// Runs the stage scripts with a configured interpreter.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: PathBuf,
    interpreter_words: Vec<String>,
    workspace: Workspace,
}

impl ScriptRunner {
    /// Split `interpreter` with shell-word rules and resolve its program on `PATH`.
    pub fn new(interpreter: &str, workspace: Workspace) -> Result<Self, StageError> {
        let invalid = || StageError::InvalidInterpreter {
            command: interpreter.to_string(),
        };
        let words = shell_words::split(interpreter).map_err(|_| invalid())?;
        let first = words.first().ok_or_else(invalid)?;
        let program = which::which_in(first, env::var_os("PATH"), workspace.root()).map_err(
            |source| StageError::InterpreterNotFound {
                interpreter: first.clone(),
                source,
            },
        )?;
        tracing::debug!(program = %program.display(), "resolved stage interpreter");
        Ok(Self {
            program,
            interpreter_words: words,
            workspace,
        })
    }

    fn run(&self, stage: Stage, args: Vec<OsString>) -> Result<StageOutput, StageError> {
        let command = self.command_line(stage, &args);
        println!("Running: {command}");
        tracing::info!(stage = stage.label(), %command, "starting stage");

        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.interpreter_words[1..])
            .arg(stage.script())
            .args(&args)
            .current_dir(self.workspace.root())
            .stdin(Stdio::inherit())
            .output()
            .map_err(|source| StageError::Launch {
                command: command.clone(),
                source,
            })?;
        let duration = start.elapsed();

        tracing::info!(
            stage = stage.label(),
            elapsed_ms = duration.as_millis() as u64,
            exit_code = output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "stage process finished"
        );

        Ok(StageOutput {
            command,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration,
        })
    }

    fn command_line(&self, stage: Stage, args: &[OsString]) -> String {
        let words = self
            .interpreter_words
            .iter()
            .cloned()
            .chain(std::iter::once(stage.script().to_string()))
            .chain(args.iter().map(|arg| arg.to_string_lossy().to_string()));
        shell_words::join(words)
    }
}

impl StageRunner for ScriptRunner {
    fn download(&self, asin: &str, auto_confirm: bool) -> Result<StageOutput, StageError> {
        let mut args = vec![OsString::from(asin)];
        if auto_confirm {
            args.push(OsString::from("--yes"));
        }
        self.run(Stage::Download, args)
    }

    fn decode(&self, book_dir: &Path, mode: DecodeMode) -> Result<StageOutput, StageError> {
        let args = vec![book_dir.as_os_str().to_owned(), OsString::from(mode.flag())];
        self.run(Stage::Decode, args)
    }

    fn package(&self, book_dir: &Path) -> Result<StageOutput, StageError> {
        self.run(Stage::Package, vec![book_dir.as_os_str().to_owned()])
    }
}
