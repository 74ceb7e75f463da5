//! Builder configuration loaded from `config.json`.
//!
//! The configuration is read once at startup and handed to every stage by
//! reference. Every field has a default, so a partial file only overrides
//! what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name, looked up in the source root.
pub const CONFIG_FILE: &str = "config.json";

/// Errors that can occur while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What to do with assets flagged `subAsset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerPolicy {
    /// Record the asset in the progress output only: no fetch, no write,
    /// no manifest line.
    #[default]
    Skip,
    /// Resolve the asset like any other; marker-only entries without a
    /// destination are still just recorded.
    Resolve,
}

/// Immutable builder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory names never treated as packages.
    pub ignored_directories: Vec<String>,
    /// Repository output directory, relative to the source root unless absolute.
    pub output_directory: PathBuf,
    /// File suffixes recognised as package entry points.
    pub valid_binary_extensions: Vec<String>,
    /// Handling of `subAsset` entries.
    pub nested_marker: MarkerPolicy,
    /// Copy the previous record of an unchanged package into the new index.
    pub carry_forward_skipped: bool,
    /// Parent directory for downloads and archive scratch space.
    pub scratch_directory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignored_directories: vec![".git".to_string()],
            output_directory: PathBuf::from("public"),
            valid_binary_extensions: [".nro", ".elf", ".rpx", ".cia", ".3dsx", ".dol"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            nested_marker: MarkerPolicy::default(),
            carry_forward_skipped: false,
            scratch_directory: None,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid configuration.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Whether `name` is a directory that must never be built.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_directories.iter().any(|d| d == name)
    }

    /// The parent directory for scratch space. A relative
    /// `scratch_directory` is resolved against `root`, like the output
    /// directory.
    pub fn scratch_parent(&self, root: &Path) -> PathBuf {
        self.scratch_directory
            .as_ref()
            .map_or_else(std::env::temp_dir, |dir| root.join(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.is_ignored(".git"));
        assert_eq!(config.output_directory, PathBuf::from("public"));
        assert!(config.valid_binary_extensions.contains(&".nro".to_string()));
        assert_eq!(config.nested_marker, MarkerPolicy::Skip);
        assert!(!config.carry_forward_skipped);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(r#"{"output_directory": "out", "nested_marker": "resolve"}"#)
            .unwrap();
        assert_eq!(config.output_directory, PathBuf::from("out"));
        assert_eq!(config.nested_marker, MarkerPolicy::Resolve);
        assert_eq!(config.ignored_directories, vec![".git".to_string()]);
        assert_eq!(config.valid_binary_extensions.len(), 6);
    }

    #[test]
    fn test_malformed_file() {
        assert!(Config::parse("{ not json").is_err());
        assert!(Config::parse(r#"{"ignored_directories": "x"}"#).is_err());
    }

    #[test]
    fn test_scratch_parent_relative_to_root() {
        let root = Path::new("/srv/packages");
        assert_eq!(Config::default().scratch_parent(root), std::env::temp_dir());

        let config = Config::parse(r#"{"scratch_directory": ".scratch"}"#).unwrap();
        assert_eq!(config.scratch_parent(root), root.join(".scratch"));

        let config = Config::parse(r#"{"scratch_directory": "/var/tmp/spool"}"#).unwrap();
        assert_eq!(config.scratch_parent(root), PathBuf::from("/var/tmp/spool"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
