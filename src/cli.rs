//! CLI argument parsing for the book pipeline.
use crate::config::{CliOverrides, DecodeMode};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Root CLI entrypoint: one book by ASIN, or a batch list.
#[derive(Parser, Debug)]
#[command(
    name = "kpipe",
    version,
    about = "Download, decode and package Kindle books as EPUB",
    after_help = "Examples:\n  kpipe B0FLBTR2FS\n  kpipe B0FLBTR2FS --yes --fast\n  kpipe B0FLBTR2FS --skip-download\n  kpipe B0FLBTR2FS --output-name \"{title} - {asin}.epub\"\n  kpipe --batch books.txt --yes\n  kpipe B0FLBTR2FS --config config.txt --show-config",
    group(ArgGroup::new("target").required(true).args(["asin", "batch"])),
    group(ArgGroup::new("mode").args(["fast", "full", "progressive"]))
)]
pub struct RootArgs {
    /// Book ASIN to process
    #[arg(value_name = "ASIN")]
    pub asin: Option<String>,

    /// Override file with `dotted.key = value` lines
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fast decode mode (hash matching only)
    #[arg(long)]
    pub fast: bool,

    /// Full decode mode (render every glyph)
    #[arg(long)]
    pub full: bool,

    /// Progressive decode mode (default)
    #[arg(long)]
    pub progressive: bool,

    /// Answer yes to the download confirmation prompt
    #[arg(long)]
    pub yes: bool,

    /// Output file name; `auto`, or a template using {asin} and {title}
    #[arg(long, value_name = "TEMPLATE")]
    pub output_name: Option<String>,

    /// Replace an existing output file
    #[arg(long)]
    pub overwrite: bool,

    /// Skip the download stage (book already downloaded)
    #[arg(long)]
    pub skip_download: bool,

    /// Skip the glyph decode stage
    #[arg(long)]
    pub skip_decode: bool,

    /// Skip EPUB creation
    #[arg(long)]
    pub skip_epub: bool,

    /// Process every ASIN listed in FILE, one per line
    #[arg(long, value_name = "FILE")]
    pub batch: Option<PathBuf>,

    /// Print the merged configuration as JSON and exit
    #[arg(long)]
    pub show_config: bool,
}

/// What a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Book(String),
    Batch(PathBuf),
}

impl RootArgs {
    pub fn decode_mode(&self) -> Option<DecodeMode> {
        if self.fast {
            Some(DecodeMode::Fast)
        } else if self.full {
            Some(DecodeMode::Full)
        } else if self.progressive {
            Some(DecodeMode::Progressive)
        } else {
            None
        }
    }

    /// The CLI configuration layer.
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            decode_mode: self.decode_mode(),
            auto_confirm: self.yes,
            output_name: self.output_name.clone(),
            overwrite: self.overwrite,
            skip_download: self.skip_download,
            skip_decode: self.skip_decode,
            skip_epub: self.skip_epub,
        }
    }

    pub fn target(&self) -> Option<Target> {
        match (&self.batch, &self.asin) {
            (Some(list), _) => Some(Target::Batch(list.clone())),
            (None, Some(asin)) => Some(Target::Book(asin.clone())),
            (None, None) => None,
        }
    }
}
