//! Typed paths into the working directory and per-book download trees.
//!
//! Stages communicate through fixed file names in the working directory and
//! through `batch_*` directories under the book's download directory; every
//! lookup of those goes through here.
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Character mapping written by the decode stage.
pub const MAPPING_FILE: &str = "ttf_character_mapping.json";
/// EPUB written by the package stage before it is renamed.
pub const EPUB_FILE: &str = "decoded_book.epub";
/// Login headers the download stage reads.
pub const HEADERS_FILE: &str = "headers.json";
/// Batch holding the book metadata.
pub const METADATA_BATCH: &str = "batch_0";
pub const METADATA_FILE: &str = "metadata.json";

fn batch_dir_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^batch_.*$").expect("regex for batch directories"))
}

fn page_data_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^page_data_.*\.json$").expect("regex for page data files")
    })
}

/// The directory the orchestrator runs in and the stages write into.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the workspace; absolute paths pass through.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.root.join(MAPPING_FILE)
    }

    pub fn epub_path(&self) -> PathBuf {
        self.root.join(EPUB_FILE)
    }

    pub fn headers_path(&self) -> PathBuf {
        self.root.join(HEADERS_FILE)
    }

    /// Locate the download directory for one book.
    pub fn book(&self, downloads_dir: &Path, asin: &str) -> BookPaths {
        let relative = downloads_dir.join(asin);
        BookPaths {
            absolute: self.resolve(&relative),
            relative,
        }
    }
}

/// A book's download directory, both as configured and as resolved.
#[derive(Debug, Clone)]
pub struct BookPaths {
    relative: PathBuf,
    absolute: PathBuf,
}

impl BookPaths {
    /// The path handed to stages, which run inside the workspace.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn dir(&self) -> &Path {
        &self.absolute
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.absolute.join(METADATA_BATCH).join(METADATA_FILE)
    }

    /// `batch_*` subdirectories, sorted by name. Missing book dir yields none.
    pub fn batch_dirs(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.absolute) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| batch_dir_pattern().is_match(name))
            })
            .map(|entry| entry.path())
            .collect();
        dirs.sort();
        dirs
    }
}

/// A batch is complete once it holds at least one `page_data_*.json` file.
pub fn is_complete_batch(batch_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(batch_dir) else {
        return false;
    };
    entries.filter_map(|entry| entry.ok()).any(|entry| {
        entry.path().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| page_data_pattern().is_match(name))
    })
}
