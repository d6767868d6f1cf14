//! Relocation run configuration.
//!
//! A run is configured by a TOML file, by command-line flags, or both (flags
//! take precedence). Configuration is resolved once, validated, and then
//! handed down as an immutable [`RelocationConfig`].
//!
//! # Configuration File Format
//!
//! ```toml
//! annotation_file = "groundtruth_weak_label_training_set.csv"
//! source_root = "downloads"
//! destination_root = "dataset"
//! filename_prefix = "Y"
//! on_conflict = "skip"        # or "overwrite"
//!
//! [columns]
//! filename = "filename"
//! label = "label"
//! delimiter = ","
//!
//! [selector]
//! label = "Bus"
//! folder = "Bus"              # optional, defaults to the label
//!
//! # ...or, instead of label/folder:
//! # [selector.mapping]
//! # door_wood_creaks = "Background_noise"
//! ```

use crate::annotation::ColumnSpec;
use crate::relocator::ConflictPolicy;
use crate::selector::LabelSelector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".labelsort.toml";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// IO error while reading configuration.
    #[error("IO error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required setting was given neither in the file nor on the command line.
    #[error("Missing required setting '{0}'")]
    MissingSetting(&'static str),

    /// No selector was configured.
    #[error("No label selector configured: set a label or a label mapping")]
    NoSelector,

    /// Both selector forms were configured.
    #[error("Conflicting label selector: set either a label or a label mapping, not both")]
    AmbiguousSelector,

    /// A mapping selector with no entries.
    #[error("Label mapping is empty")]
    EmptyMapping,

    /// A `LABEL=FOLDER` argument without a separator or with an empty side.
    #[error("Invalid label mapping '{0}': expected LABEL=FOLDER")]
    InvalidMapping(String),

    /// The delimiter is not exactly one ASCII character.
    #[error("Invalid delimiter '{0}': expected a single ASCII character")]
    InvalidDelimiter(String),

    /// A destination folder name that would escape the destination root.
    #[error("Invalid destination folder '{folder}': {reason}")]
    InvalidFolder {
        folder: String,
        reason: &'static str,
    },

    /// A filename prefix that would point outside the source root.
    #[error("Invalid filename prefix '{0}': prefix contains a path separator")]
    InvalidPrefix(String),

    /// The source root is not an existing directory.
    #[error("Source root is not a directory: {}", .0.display())]
    SourceRootNotFound(PathBuf),
}

/// Raw, partially specified settings as they appear in a configuration file.
///
/// Command-line flags are collected into the same shape and merged on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub annotation_file: Option<PathBuf>,
    pub source_root: Option<PathBuf>,
    pub destination_root: Option<PathBuf>,
    pub filename_prefix: Option<String>,
    pub on_conflict: Option<ConflictPolicy>,
    pub columns: ColumnsConfig,
    pub selector: SelectorConfig,
}

/// `[columns]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnsConfig {
    pub filename: Option<String>,
    pub label: Option<String>,
    pub delimiter: Option<String>,
}

/// `[selector]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    pub label: Option<String>,
    pub folder: Option<String>,
    pub mapping: Option<BTreeMap<String, String>>,
}

impl SelectorConfig {
    /// True if this section names which labels to select.
    fn is_set(&self) -> bool {
        self.label.is_some() || self.mapping.is_some()
    }
}

/// Fully resolved settings for one relocation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationConfig {
    pub annotation_file: PathBuf,
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub selector: LabelSelector,
    /// Prepended to each table filename on the source side only.
    pub filename_prefix: String,
    pub columns: ColumnSpec,
    pub on_conflict: ConflictPolicy,
}

impl ConfigFile {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.labelsort.toml` in the current directory
    /// 3. Look for `~/.config/labelsort/config.toml` in home directory
    /// 4. Fall back to an empty configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any file found cannot be parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("labelsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        debug!(path = %path.display(), "loaded configuration file");
        Self::parse(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Layers `overrides` on top of `self`; every setting present in
    /// `overrides` wins.
    ///
    /// A selector in `overrides` that names a label or mapping replaces the
    /// file's selector as a whole, so a command-line `--label` never collides
    /// with a mapping from the file.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        let selector = if overrides.selector.is_set() {
            overrides.selector
        } else {
            SelectorConfig {
                folder: overrides.selector.folder.or(self.selector.folder),
                ..self.selector
            }
        };

        ConfigFile {
            annotation_file: overrides.annotation_file.or(self.annotation_file),
            source_root: overrides.source_root.or(self.source_root),
            destination_root: overrides.destination_root.or(self.destination_root),
            filename_prefix: overrides.filename_prefix.or(self.filename_prefix),
            on_conflict: overrides.on_conflict.or(self.on_conflict),
            columns: ColumnsConfig {
                filename: overrides.columns.filename.or(self.columns.filename),
                label: overrides.columns.label.or(self.columns.label),
                delimiter: overrides.columns.delimiter.or(self.columns.delimiter),
            },
            selector,
        }
    }

    /// Validates the settings and produces a [`RelocationConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if a required path is missing, if the selector is
    /// absent, ambiguous or empty, if a folder name is not a single path
    /// component, or if the delimiter is not a single ASCII character.
    pub fn resolve(self) -> Result<RelocationConfig, ConfigError> {
        let annotation_file = self
            .annotation_file
            .ok_or(ConfigError::MissingSetting("annotation_file"))?;
        let source_root = self
            .source_root
            .ok_or(ConfigError::MissingSetting("source_root"))?;
        let destination_root = self
            .destination_root
            .ok_or(ConfigError::MissingSetting("destination_root"))?;

        let selector = resolve_selector(self.selector)?;
        for folder in selector.folders() {
            validate_folder(folder)?;
        }

        let filename_prefix = self.filename_prefix.unwrap_or_default();
        if filename_prefix.contains('/') || filename_prefix.contains('\\') {
            return Err(ConfigError::InvalidPrefix(filename_prefix));
        }

        let defaults = ColumnSpec::default();
        let delimiter = match self.columns.delimiter {
            Some(d) => parse_delimiter(&d)?,
            None => defaults.delimiter,
        };
        let columns = ColumnSpec {
            filename: self.columns.filename.unwrap_or(defaults.filename),
            label: self.columns.label.unwrap_or(defaults.label),
            delimiter,
        };

        Ok(RelocationConfig {
            annotation_file,
            source_root,
            destination_root,
            selector,
            filename_prefix,
            columns,
            on_conflict: self.on_conflict.unwrap_or_default(),
        })
    }
}

impl RelocationConfig {
    /// Checks that the source root is an existing directory.
    pub fn check_roots(&self) -> Result<(), ConfigError> {
        if !self.source_root.is_dir() {
            return Err(ConfigError::SourceRootNotFound(self.source_root.clone()));
        }
        Ok(())
    }
}

fn resolve_selector(config: SelectorConfig) -> Result<LabelSelector, ConfigError> {
    match (config.label, config.mapping) {
        (Some(_), Some(_)) => Err(ConfigError::AmbiguousSelector),
        (None, None) => Err(ConfigError::NoSelector),
        (Some(label), None) => {
            let folder = config.folder.unwrap_or_else(|| label.clone());
            Ok(LabelSelector::exact_into(label, folder))
        }
        (None, Some(mapping)) => {
            if config.folder.is_some() {
                return Err(ConfigError::AmbiguousSelector);
            }
            if mapping.is_empty() {
                return Err(ConfigError::EmptyMapping);
            }
            Ok(LabelSelector::Mapping(mapping))
        }
    }
}

/// Destination folders must be a single, non-empty path component.
fn validate_folder(folder: &str) -> Result<(), ConfigError> {
    let reason = if folder.is_empty() {
        "folder name is empty"
    } else if folder == "." || folder == ".." {
        "folder name refers to a parent or current directory"
    } else if folder.contains('/') || folder.contains('\\') {
        "folder name contains a path separator"
    } else {
        return Ok(());
    };

    Err(ConfigError::InvalidFolder {
        folder: folder.to_string(),
        reason,
    })
}

fn parse_delimiter(value: &str) -> Result<u8, ConfigError> {
    let value_unescaped = if value == "\\t" { "\t" } else { value };
    match value_unescaped.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ConfigError::InvalidDelimiter(value.to_string())),
    }
}

/// Parses a `LABEL=FOLDER` command-line argument.
///
/// The label may itself contain `=`; the split happens at the last one.
pub fn parse_mapping_pair(arg: &str) -> Result<(String, String), ConfigError> {
    match arg.rsplit_once('=') {
        Some((label, folder)) if !label.is_empty() && !folder.is_empty() => {
            Ok((label.to_string(), folder.to_string()))
        }
        _ => Err(ConfigError::InvalidMapping(arg.to_string())),
    }
}
