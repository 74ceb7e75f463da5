//! Shared types and wire format for spool package repositories.
//!
//! Producers (the builder) and consumers (installers reading `repo.json`)
//! agree on these shapes.

pub mod descriptor;
pub mod index;
pub mod types;

// Re-exports
pub use descriptor::{Asset, AssetKind, DESCRIPTOR_FILE, InstallOp, PackageDescriptor, PackageInfo};
pub use index::{INDEX_FILE, PackageRecord, PackageSummary, RepoIndex, UNTRACKED_DOWNLOADS};
pub use types::*;

/// Errors raised while decoding or validating descriptors and indexes.
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    /// The file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON is malformed or does not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An asset contradicts the rules for its declared type.
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// A package name that is not a single path component.
    #[error("Invalid package name: '{0}'")]
    InvalidName(String),
}
