//! Layered orchestrator configuration.
//!
//! The raw configuration is a nested tree so override files can add or
//! reshape keys freely. It is built once from three layers (defaults, an
//! optional override file, CLI flags) and then read through the typed
//! [`Config`] view, which never changes after construction.
mod parse;

use crate::error::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub(crate) use parse::parse_overrides;

/// Sentinel output name meaning "use the sanitized book title".
pub const AUTO_OUTPUT_NAME: &str = "auto";

pub type ConfigTree = BTreeMap<String, ConfigValue>;

/// One node of the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Section(ConfigTree),
}

/// Decode strategy forwarded to the glyph decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    Fast,
    Full,
    #[default]
    Progressive,
}

impl DecodeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DecodeMode::Fast => "fast",
            DecodeMode::Full => "full",
            DecodeMode::Progressive => "progressive",
        }
    }

    /// The decoder flag for this mode.
    pub fn flag(self) -> &'static str {
        match self {
            DecodeMode::Fast => "--fast",
            DecodeMode::Full => "--full",
            DecodeMode::Progressive => "--progressive",
        }
    }
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecodeMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fast" => Ok(DecodeMode::Fast),
            "full" => Ok(DecodeMode::Full),
            "progressive" => Ok(DecodeMode::Progressive),
            _ => Err(()),
        }
    }
}

/// Final layer applied from command-line flags.
///
/// `None`/`false` fields leave the lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub decode_mode: Option<DecodeMode>,
    pub auto_confirm: bool,
    pub output_name: Option<String>,
    pub overwrite: bool,
    pub skip_download: bool,
    pub skip_decode: bool,
    pub skip_epub: bool,
}

impl CliOverrides {
    /// Express the flags as a tree so they merge like any other layer.
    pub fn to_tree(&self) -> ConfigTree {
        let mut tree = ConfigTree::new();
        let mut set = |key: &str, value: ConfigValue| parse::insert_dotted(&mut tree, key, value);
        if let Some(mode) = self.decode_mode {
            set("pipeline.decode.mode", ConfigValue::Str(mode.to_string()));
        }
        if self.auto_confirm {
            set("pipeline.download.auto_confirm", ConfigValue::Bool(true));
        }
        if let Some(name) = &self.output_name {
            set("pipeline.epub.output_name", ConfigValue::Str(name.clone()));
        }
        if self.overwrite {
            set("pipeline.epub.overwrite", ConfigValue::Bool(true));
        }
        if self.skip_download {
            set("pipeline.download.enabled", ConfigValue::Bool(false));
        }
        if self.skip_decode {
            set("pipeline.decode.enabled", ConfigValue::Bool(false));
        }
        if self.skip_epub {
            set("pipeline.epub.enabled", ConfigValue::Bool(false));
        }
        tree
    }
}

/// Built-in defaults for every recognized key.
pub fn default_tree() -> ConfigTree {
    let entries: [(&str, ConfigValue); 19] = [
        ("pipeline.download.enabled", ConfigValue::Bool(true)),
        ("pipeline.download.pages_per_batch", ConfigValue::Int(5)),
        ("pipeline.download.auto_confirm", ConfigValue::Bool(false)),
        ("pipeline.decode.enabled", ConfigValue::Bool(true)),
        ("pipeline.decode.mode", str_value("progressive")),
        ("pipeline.decode.early_exit", ConfigValue::Bool(true)),
        ("pipeline.decode.save_images", ConfigValue::Bool(true)),
        ("pipeline.epub.enabled", ConfigValue::Bool(true)),
        ("pipeline.epub.output_name", str_value(AUTO_OUTPUT_NAME)),
        ("pipeline.epub.include_metadata", ConfigValue::Bool(true)),
        ("pipeline.epub.overwrite", ConfigValue::Bool(false)),
        ("pipeline.interpreter", str_value("python3")),
        ("paths.downloads", str_value("downloads")),
        ("paths.fonts", str_value("fonts")),
        ("paths.output", str_value("output")),
        ("batch.continue_on_error", ConfigValue::Bool(true)),
        ("logging.level", str_value("INFO")),
        ("logging.save_logs", ConfigValue::Bool(true)),
        ("logging.log_file", str_value("kindle_processor.log")),
    ];
    let mut tree = ConfigTree::new();
    for (key, value) in entries {
        parse::insert_dotted(&mut tree, key, value);
    }
    tree
}

fn str_value(value: &str) -> ConfigValue {
    ConfigValue::Str(value.to_string())
}

/// Merge `overrides` onto `base`, returning a new tree.
///
/// Sections merge recursively; any other pairing replaces the base value.
pub fn merge_trees(base: &ConfigTree, overrides: &ConfigTree) -> ConfigTree {
    let mut merged = base.clone();
    for (key, value) in overrides {
        let replacement = match (merged.get(key), value) {
            (Some(ConfigValue::Section(existing)), ConfigValue::Section(incoming)) => {
                ConfigValue::Section(merge_trees(existing, incoming))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), replacement);
    }
    merged
}

/// Three-layer builder: defaults, override file, CLI flags.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    tree: ConfigTree,
}

impl ConfigBuilder {
    pub fn defaults() -> Self {
        Self {
            tree: default_tree(),
        }
    }

    /// Layer an override file on top. A path that does not exist is ignored.
    pub fn with_file(self, path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(self);
        };
        if !path.exists() {
            eprintln!(
                "warning: config file {} not found; using defaults",
                path.display()
            );
            return Ok(self);
        }
        eprintln!("Loading configuration from: {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let overrides = parse_overrides(&text);
        Ok(self.with_overrides(&overrides))
    }

    pub fn with_overrides(self, overrides: &ConfigTree) -> Self {
        Self {
            tree: merge_trees(&self.tree, overrides),
        }
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        Config::from_tree(self.tree)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub enabled: bool,
    pub auto_confirm: bool,
}

#[derive(Debug, Clone)]
pub struct DecodeSettings {
    pub enabled: bool,
    pub mode: DecodeMode,
}

#[derive(Debug, Clone)]
pub struct EpubSettings {
    pub enabled: bool,
    pub output_name: String,
    pub include_metadata: bool,
    pub overwrite: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub save_logs: bool,
    pub log_file: PathBuf,
}

/// Immutable typed view of the merged configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub download: DownloadSettings,
    pub decode: DecodeSettings,
    pub epub: EpubSettings,
    pub interpreter: String,
    pub downloads_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub continue_on_error: bool,
    pub logging: LoggingSettings,
    tree: ConfigTree,
}

impl Config {
    pub fn from_tree(tree: ConfigTree) -> Result<Self, ConfigError> {
        let mode_key = "pipeline.decode.mode";
        let mode = lookup_str(&tree, mode_key)?
            .parse::<DecodeMode>()
            .map_err(|()| ConfigError::InvalidValue {
                key: mode_key.to_string(),
                expected: "one of fast, full, progressive",
            })?;
        Ok(Self {
            download: DownloadSettings {
                enabled: lookup_bool(&tree, "pipeline.download.enabled")?,
                auto_confirm: lookup_bool(&tree, "pipeline.download.auto_confirm")?,
            },
            decode: DecodeSettings {
                enabled: lookup_bool(&tree, "pipeline.decode.enabled")?,
                mode,
            },
            epub: EpubSettings {
                enabled: lookup_bool(&tree, "pipeline.epub.enabled")?,
                output_name: lookup_str(&tree, "pipeline.epub.output_name")?,
                include_metadata: lookup_bool(&tree, "pipeline.epub.include_metadata")?,
                overwrite: lookup_bool(&tree, "pipeline.epub.overwrite")?,
            },
            interpreter: lookup_str(&tree, "pipeline.interpreter")?,
            downloads_dir: PathBuf::from(lookup_str(&tree, "paths.downloads")?),
            fonts_dir: PathBuf::from(lookup_str(&tree, "paths.fonts")?),
            continue_on_error: lookup_bool(&tree, "batch.continue_on_error")?,
            logging: LoggingSettings {
                level: lookup_str(&tree, "logging.level")?,
                save_logs: lookup_bool(&tree, "logging.save_logs")?,
                log_file: PathBuf::from(lookup_str(&tree, "logging.log_file")?),
            },
            tree,
        })
    }

    /// The merged tree this view was extracted from.
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }
}

/// Defaults plus an optional override file, ready for the CLI layer.
pub fn load_config(path: Option<&Path>) -> Result<ConfigBuilder, ConfigError> {
    ConfigBuilder::defaults().with_file(path)
}

fn lookup<'a>(tree: &'a ConfigTree, key: &str) -> Option<&'a ConfigValue> {
    let mut parts = key.split('.');
    let mut node = tree.get(parts.next()?)?;
    for part in parts {
        match node {
            ConfigValue::Section(section) => node = section.get(part)?,
            _ => return None,
        }
    }
    Some(node)
}

fn lookup_bool(tree: &ConfigTree, key: &str) -> Result<bool, ConfigError> {
    match lookup(tree, key) {
        Some(ConfigValue::Bool(value)) => Ok(*value),
        Some(ConfigValue::Int(value)) => Ok(*value != 0),
        Some(ConfigValue::Str(value)) => Ok(!value.is_empty()),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a boolean",
        }),
    }
}

fn lookup_str(tree: &ConfigTree, key: &str) -> Result<String, ConfigError> {
    match lookup(tree, key) {
        Some(ConfigValue::Str(value)) => Ok(value.clone()),
        Some(ConfigValue::Int(value)) => Ok(value.to_string()),
        Some(ConfigValue::Bool(value)) => Ok(value.to_string()),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}
