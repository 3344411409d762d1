//! Naming and placing the finished EPUB.
use crate::config::AUTO_OUTPUT_NAME;
use crate::error::PipelineError;
use crate::paths::{BookPaths, Workspace};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn illegal_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("regex for illegal filename chars"))
}

/// Book title from `batch_0/metadata.json`, or `None` if it cannot be read.
pub fn read_metadata_title(book: &BookPaths) -> Option<String> {
    let path = book.metadata_path();
    if !path.is_file() {
        return None;
    }
    let parsed = fs::read(&path)
        .map_err(|err| err.to_string())
        .and_then(|bytes| {
            serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|err| err.to_string())
        });
    match parsed {
        Ok(value) => {
            let title = value
                .get("bookTitle")
                .and_then(|title| title.as_str())
                .map(str::to_string);
            if title.is_none() {
                tracing::warn!(path = %path.display(), "metadata has no string bookTitle");
            }
            title
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "unreadable book metadata");
            None
        }
    }
}

/// Strip characters that are illegal in file names, then surrounding whitespace.
pub fn sanitize_title(title: &str) -> String {
    illegal_chars().replace_all(title, "").trim().to_string()
}

/// Sanitized title, falling back to the ASIN when there is nothing usable.
pub fn resolve_title(book: &BookPaths, asin: &str, include_metadata: bool) -> String {
    let title = include_metadata
        .then(|| read_metadata_title(book))
        .flatten()
        .map(|title| sanitize_title(&title))
        .filter(|title| !title.is_empty());
    title.unwrap_or_else(|| asin.to_string())
}

/// `auto` means `<title>.epub`; anything else is a `{asin}`/`{title}` template.
pub fn output_file_name(output_name: &str, asin: &str, title: &str) -> String {
    if output_name == AUTO_OUTPUT_NAME {
        return format!("{title}.epub");
    }
    let name = output_name.replace("{asin}", asin).replace("{title}", title);
    if name.ends_with(".epub") {
        name
    } else {
        format!("{name}.epub")
    }
}

/// Move the fixed-name EPUB to `file_name` inside the workspace.
///
/// An existing target is an error unless `overwrite` is set.
pub fn place_epub(
    workspace: &Workspace,
    file_name: &str,
    overwrite: bool,
) -> Result<PathBuf, PipelineError> {
    let source = workspace.epub_path();
    let target = workspace.resolve(Path::new(file_name));
    if target == source {
        return Ok(target);
    }
    let rename_error = |source_err: std::io::Error| PipelineError::Rename {
        from: source.clone(),
        to: target.clone(),
        source: source_err,
    };
    if target.exists() {
        if !overwrite {
            return Err(PipelineError::OutputExists {
                path: target.clone(),
            });
        }
        tracing::warn!(path = %target.display(), "overwriting existing EPUB");
        fs::remove_file(&target).map_err(rename_error)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(rename_error)?;
    }
    fs::rename(&source, &target).map_err(rename_error)?;
    Ok(target)
}
