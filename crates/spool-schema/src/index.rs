//! Repository index (`repo.json`) and per-package metadata records.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SchemaError;
use crate::types::{PackageName, Version};

/// File name of the repository index inside the output directory.
pub const INDEX_FILE: &str = "repo.json";

/// Placeholder for download counters that are not tracked yet.
pub const UNTRACKED_DOWNLOADS: i64 = -1;

/// Descriptor-derived package metadata, written to `info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    /// Package identity.
    pub name: PackageName,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Author credit.
    #[serde(default)]
    pub author: String,
    /// Category.
    #[serde(default)]
    pub category: String,
    /// Declared version.
    pub version: Version,
    /// License identifier.
    #[serde(default)]
    pub license: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Long-form details.
    #[serde(default)]
    pub details: String,
    /// Project homepage.
    #[serde(default)]
    pub url: String,
    /// Release notes, `null` when none were declared.
    #[serde(default)]
    pub changelog: Option<String>,
    /// Release date, `YYYY-MM-DD`.
    #[serde(default)]
    pub updated: String,
}

/// One package's entry in the repository index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Descriptor-derived fields.
    #[serde(flatten)]
    pub summary: PackageSummary,
    /// Size of the package tree in KiB.
    #[serde(default)]
    pub extracted: u64,
    /// Size of the package zip in KiB.
    #[serde(default)]
    pub filesize: u64,
    /// Entry-point path, `"none"` for themes, empty when unknown.
    #[serde(default)]
    pub binary: String,
    /// Web download count.
    #[serde(default = "untracked")]
    pub web_dls: i64,
    /// In-app download count.
    #[serde(default = "untracked")]
    pub app_dls: i64,
}

fn untracked() -> i64 {
    UNTRACKED_DOWNLOADS
}

impl PackageRecord {
    /// Package identity.
    pub fn name(&self) -> &PackageName {
        &self.summary.name
    }

    /// Declared version.
    pub fn version(&self) -> &Version {
        &self.summary.version
    }
}

/// The ordered list of every package published by one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIndex {
    /// Records in package-processing order.
    pub packages: Vec<PackageRecord>,
}

impl RepoIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the record for `name`, if any.
    pub fn find(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.summary.name == name)
    }

    /// Append a record, preserving insertion order.
    pub fn push(&mut self, record: PackageRecord) {
        self.packages.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index has no records.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Parse an index from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] if the text is not a valid index.
    pub fn from_json(content: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize the index as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load an index from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the index to disk, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), SchemaError> {
        let mut content = self.to_json()?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }
}
