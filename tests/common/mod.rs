//! Shared test infrastructure for integration tests.
//!
//! Each test gets a throwaway working directory with stand-in stage scripts
//! written for `sh`. Marker files steer their behavior:
//! `fail_download`, `fail_decode`, `no_epub`, `fail_asins` (one ASIN per
//! line) and `title.txt` (book title written to metadata).
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use tempfile::TempDir;

pub const CONFIG: &str = "kpipe.conf";

const DOWNLOAD_SCRIPT: &str = r#"echo "download $*" >> calls.log
if [ -f fail_download ] || grep -qx "$1" fail_asins 2>/dev/null; then
  mkdir -p "downloads/$1/batch_9"
  echo "download failed for $1" >&2
  exit 3
fi
mkdir -p "downloads/$1/batch_0"
echo '{}' > "downloads/$1/batch_0/page_data_0_5.json"
if [ -f title.txt ]; then
  printf '{"bookTitle": "%s"}' "$(cat title.txt)" > "downloads/$1/batch_0/metadata.json"
fi
echo "downloaded $1"
"#;

const DECODE_SCRIPT: &str = r#"echo "decode $*" >> calls.log
if [ -f fail_decode ]; then
  echo "decoder crashed" >&2
  exit 2
fi
echo '{}' > ttf_character_mapping.json
echo "decoded $1"
"#;

const PACKAGE_SCRIPT: &str = r#"echo "package $*" >> calls.log
if [ -f no_epub ]; then
  exit 0
fi
echo epub > decoded_book.epub
"#;

pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// A workspace that passes every prerequisite check.
    pub fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().expect("create temp workspace"),
        };
        workspace.write("download_full_book.py", DOWNLOAD_SCRIPT);
        workspace.write("decode_glyphs_complete.py", DECODE_SCRIPT);
        workspace.write("create_epub.py", PACKAGE_SCRIPT);
        workspace.write("headers.json", "{}");
        workspace.write("fonts/Bookerly.ttf", "");
        workspace.write(
            CONFIG,
            "# stand-in stages are shell scripts\npipeline.interpreter = sh\nlogging.save_logs = false\n",
        );
        workspace
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write workspace file");
    }

    pub fn touch(&self, relative: &str) {
        self.write(relative, "");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("read workspace file")
    }

    /// Run `kpipe` inside the workspace with a clean log filter.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_kpipe"))
            .args(args)
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .output()
            .expect("spawn kpipe")
    }

    /// Start `kpipe` without waiting for it, output captured.
    pub fn spawn(&self, args: &[&str]) -> Child {
        Command::new(env!("CARGO_BIN_EXE_kpipe"))
            .args(args)
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn kpipe")
    }

    /// Stage invocations recorded by the stand-in scripts, in order.
    pub fn calls(&self) -> Vec<String> {
        match fs::read_to_string(self.path("calls.log")) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Batch reports written so far.
    pub fn reports(&self) -> Vec<PathBuf> {
        let mut reports: Vec<PathBuf> = fs::read_dir(self.root())
            .expect("list workspace")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("batch_report_") && name.ends_with(".json"))
            })
            .collect();
        reports.sort();
        reports
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
