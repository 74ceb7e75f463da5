//! Domain-specific errors for asset resolution and package builds

use std::path::{Path, PathBuf};

use spool_schema::SchemaError;
use thiserror::Error;

use crate::io::bundle::BundleError;
use crate::io::extract::ExtractError;
use crate::io::fetch::FetchError;

/// Failure of a single asset. Siblings keep resolving.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} already exists, refusing to overwrite")]
    Conflict(PathBuf),

    #[error("Asset of unknown type '{0}'")]
    UnknownType(String),
}

impl AssetError {
    /// Create a write error for `path`.
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure of a whole package. Other packages keep building.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid pkgbuild.json: {0}")]
    Descriptor(#[from] SchemaError),

    #[error("Failed to create manifest: {0}")]
    Manifest(#[source] std::io::Error),

    #[error("Failed to write info.json: {0}")]
    Info(#[source] std::io::Error),

    #[error("Failed to create zip archive: {0}")]
    Archive(#[from] BundleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure that stops the whole run.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{0} is not empty and is not a package repository")]
    OutputConflict(PathBuf),

    #[error("Failed to prepare output directory {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create scratch directory under {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list packages: {0}")]
    Discovery(#[source] std::io::Error),

    #[error("Failed to initialise HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to write repository index: {0}")]
    IndexWrite(#[source] SchemaError),
}
