//! Best-effort cleanup after a failed pipeline.
//!
//! Complete batches are kept so a re-run can resume from them. Everything
//! else a failed run may have left behind is removed. Errors never stop the
//! sweep; they are returned as actions instead.
use crate::paths::{is_complete_batch, BookPaths, Workspace};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    RemovedBatch(PathBuf),
    RemovedFile(PathBuf),
    Failed { path: PathBuf, error: String },
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupAction::RemovedBatch(path) => {
                write!(f, "Removing incomplete batch: {}", path.display())
            }
            CleanupAction::RemovedFile(path) => {
                write!(f, "Removing partial file: {}", path.display())
            }
            CleanupAction::Failed { path, error } => {
                write!(f, "Could not remove {}: {error}", path.display())
            }
        }
    }
}

/// Remove incomplete batches of `book` and the fixed-name intermediates.
///
/// Safe to call repeatedly; a second call finds nothing to do.
pub fn cleanup_on_failure(workspace: &Workspace, book: &BookPaths) -> Vec<CleanupAction> {
    let mut actions = Vec::new();

    for batch in book.batch_dirs() {
        if is_complete_batch(&batch) {
            continue;
        }
        actions.push(match fs::remove_dir_all(&batch) {
            Ok(()) => CleanupAction::RemovedBatch(batch),
            Err(err) => failed(batch, &err),
        });
    }

    for path in [workspace.mapping_path(), workspace.epub_path()] {
        if let Some(action) = remove_if_present(&path) {
            actions.push(action);
        }
    }

    for action in &actions {
        tracing::info!(%action, "cleanup");
    }
    actions
}

fn remove_if_present(path: &Path) -> Option<CleanupAction> {
    match fs::remove_file(path) {
        Ok(()) => Some(CleanupAction::RemovedFile(path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => Some(failed(path.to_path_buf(), &err)),
    }
}

fn failed(path: PathBuf, err: &io::Error) -> CleanupAction {
    CleanupAction::Failed {
        path,
        error: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Workspace, BookPaths) {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path().to_path_buf());
        let book = workspace.book(Path::new("downloads"), "B0TEST");
        fs::create_dir_all(book.dir()).expect("book dir");
        (dir, workspace, book)
    }

    #[test]
    fn keeps_complete_batches_and_removes_incomplete_ones() {
        let (_dir, workspace, book) = setup();
        let complete = book.dir().join("batch_0");
        let incomplete = book.dir().join("batch_1");
        fs::create_dir_all(&complete).expect("complete");
        fs::write(complete.join("page_data_0_5.json"), "{}").expect("page data");
        fs::create_dir_all(incomplete.join("nested")).expect("incomplete");
        fs::write(incomplete.join("metadata.json"), "{}").expect("metadata");

        let actions = cleanup_on_failure(&workspace, &book);

        assert!(complete.join("page_data_0_5.json").is_file());
        assert!(!incomplete.exists());
        assert_eq!(actions, vec![CleanupAction::RemovedBatch(incomplete)]);
    }

    #[test]
    fn removes_intermediates_and_is_idempotent() {
        let (_dir, workspace, book) = setup();
        fs::write(workspace.mapping_path(), "{}").expect("mapping");
        fs::write(workspace.epub_path(), "epub").expect("epub");

        let actions = cleanup_on_failure(&workspace, &book);
        assert_eq!(
            actions,
            vec![
                CleanupAction::RemovedFile(workspace.mapping_path()),
                CleanupAction::RemovedFile(workspace.epub_path()),
            ]
        );
        assert!(!workspace.mapping_path().exists());
        assert!(!workspace.epub_path().exists());

        assert!(cleanup_on_failure(&workspace, &book).is_empty());
    }

    #[test]
    fn missing_book_dir_is_not_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path().to_path_buf());
        let book = workspace.book(Path::new("downloads"), "ABSENT");
        assert!(cleanup_on_failure(&workspace, &book).is_empty());
    }

    #[test]
    fn action_messages_are_readable() {
        let action = CleanupAction::RemovedFile(PathBuf::from("decoded_book.epub"));
        assert_eq!(action.to_string(), "Removing partial file: decoded_book.epub");
    }
}
