//! Startup checks for the inputs every stage depends on.
//!
//! These are existence checks only; nothing is opened or validated.
use crate::error::PrereqError;
use crate::paths::Workspace;
use crate::stage::STAGE_SCRIPTS;
use std::fs;
use std::path::Path;

/// What the checks found, for the startup banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrereqReport {
    pub font_files: usize,
}

/// Fail on the first missing script, headers file, or font asset.
pub fn check_prerequisites(
    workspace: &Workspace,
    fonts_dir: &Path,
) -> Result<PrereqReport, PrereqError> {
    for script in STAGE_SCRIPTS {
        if !workspace.resolve(Path::new(script)).exists() {
            return Err(PrereqError::MissingScript {
                name: script.to_string(),
            });
        }
    }
    tracing::debug!("required scripts found");

    let headers = workspace.headers_path();
    if !headers.exists() {
        return Err(PrereqError::MissingHeaders { path: headers });
    }
    tracing::debug!(path = %headers.display(), "headers found");

    let fonts = workspace.resolve(fonts_dir);
    if !fonts.is_dir() {
        return Err(PrereqError::MissingFontsDir {
            path: fonts_dir.to_path_buf(),
        });
    }
    let font_files = count_font_files(&fonts)?;
    if font_files == 0 {
        return Err(PrereqError::NoFontFiles {
            path: fonts_dir.to_path_buf(),
        });
    }
    tracing::debug!(font_files, "fonts found");

    Ok(PrereqReport { font_files })
}

fn count_font_files(dir: &Path) -> Result<usize, PrereqError> {
    let entries = fs::read_dir(dir).map_err(|source| PrereqError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ttf"))
        .count())
}
