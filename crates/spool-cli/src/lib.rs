//! spool - package repository builder
//!
//! Walks a directory of package sources, each described by a
//! `pkgbuild.json`, resolves their assets into an installable layout and
//! publishes per-package zips plus a `repo.json` index.
//!
//! # Output Layout
//!
//! ```text
//! <output>/
//! ├── repo.json                 # Repository index
//! ├── zips/<name>.zip           # Package archives
//! └── packages/<name>/          # Published icon.png and screen.png
//! ```

pub mod reporter;

pub use reporter::ConsoleReporter;

use std::path::PathBuf;

use clap::Parser;
use spool_core::config::CONFIG_FILE;
use spool_core::{Config, Reporter, RunOptions};

/// Command-line arguments for `spool`.
#[derive(Debug, Parser)]
#[command(name = "spool")]
#[command(author, version, about = "Build an installable package repository from pkgbuild.json sources")]
pub struct Cli {
    /// Directory holding the package directories
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file [default: <ROOT>/config.json]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory, relative to the root unless absolute
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Build only this package
    #[arg(short, long)]
    pub package: Option<String>,

    /// Force full rebuild (ignore existing index)
    #[arg(long)]
    pub full: bool,
}

impl Cli {
    /// Path of the configuration file to read.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.root.join(CONFIG_FILE))
    }

    /// Load the configuration and apply command-line overrides.
    ///
    /// A missing or malformed file is reported as a warning and the
    /// defaults are used instead.
    pub fn load_config(&self, reporter: &dyn Reporter) -> Config {
        let path = self.config_path();
        let mut config = match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                reporter.warning(&format!(
                    "could not load {}: {e}; using defaults",
                    path.display()
                ));
                Config::default()
            }
        };
        if let Some(output) = &self.output {
            config.output_directory.clone_from(output);
        }
        config
    }

    /// Options for the repository build.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            root: self.root.clone(),
            filter: self.package.clone(),
            full: self.full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_core::NullReporter;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["spool"]);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.config_path(), PathBuf::from("./config.json"));
        assert!(!cli.full);
        assert!(cli.package.is_none());
    }

    #[test]
    fn test_run_options() {
        let cli = Cli::parse_from(["spool", "--root", "src", "--package", "foo", "--full"]);
        let opts = cli.run_options();
        assert_eq!(opts.root, PathBuf::from("src"));
        assert_eq!(opts.filter.as_deref(), Some("foo"));
        assert!(opts.full);
    }

    #[test]
    fn test_output_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"output_directory": "site", "valid_binary_extensions": [".nro"]}"#,
        )
        .unwrap();
        let root = dir.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from(["spool", "--root", root.as_str()]);
        let config = cli.load_config(&NullReporter);
        assert_eq!(config.output_directory, PathBuf::from("site"));
        assert_eq!(config.valid_binary_extensions, vec![".nro".to_string()]);

        let cli = Cli::parse_from(["spool", "--root", root.as_str(), "--output", "dist"]);
        assert_eq!(cli.load_config(&NullReporter).output_directory, PathBuf::from("dist"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["spool", "--root", root.as_str()]);
        assert_eq!(cli.load_config(&NullReporter), Config::default());
    }
}
