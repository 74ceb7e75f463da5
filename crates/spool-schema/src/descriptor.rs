//! Package build descriptors (`pkgbuild.json`).
//!
//! The descriptor is decoded into a loose wire shape first and then
//! validated into the typed [`Asset`] tree, so later stages never see an
//! asset whose fields contradict its kind.

use std::path::{Component, Path};

use serde::Deserialize;

use crate::SchemaError;
use crate::types::{PackageName, Version};

/// File name of the build descriptor inside each package directory.
pub const DESCRIPTOR_FILE: &str = "pkgbuild.json";

/// A package's build descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageDescriptor {
    /// Package identity, used for output paths and index lookups.
    #[serde(rename = "package")]
    pub name: PackageName,
    /// Human-facing metadata.
    pub info: PackageInfo,
    /// Release notes for this version.
    #[serde(default)]
    pub changelog: Option<String>,
    /// Deprecated spelling of `changelog`.
    #[serde(default)]
    pub changes: Option<String>,
    /// Ordered asset list.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// The `info` object of a build descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInfo {
    /// Display title.
    pub title: String,
    /// Declared version; compared verbatim against the previous index.
    pub version: Version,
    /// Category, e.g. `tool`, `game`, `theme`.
    pub category: String,
    /// Author credit.
    #[serde(default)]
    pub author: String,
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
    /// Release time in Unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Explicit entry-point path, overriding binary detection.
    #[serde(default)]
    pub binary: Option<String>,
}

impl PackageDescriptor {
    /// Parse and validate a descriptor from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] for malformed JSON or missing required
    /// fields, including asset validation failures, and
    /// [`SchemaError::InvalidName`] when the package name is not a single
    /// path component.
    pub fn parse(content: &str) -> Result<Self, SchemaError> {
        let descriptor: Self = serde_json::from_str(content)?;
        check_name(&descriptor.name)?;
        Ok(descriptor)
    }

    /// Read and parse the descriptor stored in `package_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(package_dir: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(package_dir.join(DESCRIPTOR_FILE))?;
        Self::parse(&content)
    }

    /// The changelog text, preferring the deprecated `changes` field when
    /// both are present.
    pub fn changelog_text(&self) -> Option<&str> {
        self.changes.as_deref().or(self.changelog.as_deref())
    }
}

impl std::str::FromStr for PackageDescriptor {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// How an installed asset is recorded in the install manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOp {
    /// Overwritten on every update.
    Update,
    /// Installed only if absent.
    Get,
    /// Extracted by the installer.
    Extract,
    /// Local-only file, never overwritten.
    Local,
}

impl InstallOp {
    /// The single-letter opcode written to the manifest.
    pub fn opcode(self) -> char {
        match self {
            Self::Update => 'U',
            Self::Get => 'G',
            Self::Extract => 'E',
            Self::Local => 'L',
        }
    }

    /// The descriptor spelling of this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Get => "get",
            Self::Extract => "extract",
            Self::Local => "local",
        }
    }
}

/// What an asset does once its bytes are available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    /// Copy into the package tree and record a manifest line.
    Install {
        /// Manifest operation.
        op: InstallOp,
        /// Destination as declared, relative to the package root.
        dest: String,
    },
    /// Package icon, also published beside the index.
    Icon,
    /// Package screenshot, also published beside the index.
    Screenshot,
    /// Zip archive whose entries are resolved as assets of their own.
    Archive {
        /// Sub-assets, sourced by in-archive path.
        entries: Vec<Asset>,
    },
    /// Marker-only entry with nothing to install.
    Marker,
    /// A `type` this builder does not know; reported and skipped.
    Unknown {
        /// The declared type string.
        tag: String,
    },
}

/// A declared asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAsset")]
pub struct Asset {
    /// URL, package-relative path, or in-archive path.
    pub source: String,
    /// Flagged as living inside a parent archive (`subAsset`).
    pub marker: bool,
    /// What to do with the fetched bytes.
    pub kind: AssetKind,
}

impl Asset {
    /// The declared type name, for progress output.
    pub fn type_name(&self) -> &str {
        match &self.kind {
            AssetKind::Install { op, .. } => op.as_str(),
            AssetKind::Icon => "icon",
            AssetKind::Screenshot => "screenshot",
            AssetKind::Archive { .. } => "zip",
            AssetKind::Marker => "marker",
            AssetKind::Unknown { tag } => tag,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    dest: Option<String>,
    #[serde(default)]
    zip: Vec<RawAsset>,
    #[serde(default, rename = "subAsset")]
    sub_asset: bool,
}

impl TryFrom<RawAsset> for Asset {
    type Error = SchemaError;

    fn try_from(raw: RawAsset) -> Result<Self, Self::Error> {
        let source = raw
            .url
            .or(raw.path)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SchemaError::InvalidAsset(format!("{} asset has no source", raw.kind)))?;

        let op = match raw.kind.as_str() {
            "update" => Some(InstallOp::Update),
            "get" => Some(InstallOp::Get),
            "extract" => Some(InstallOp::Extract),
            "local" => Some(InstallOp::Local),
            _ => None,
        };

        let kind = match (raw.kind.as_str(), op) {
            (_, Some(op)) => match raw.dest {
                Some(dest) => {
                    check_relative(&dest)?;
                    AssetKind::Install { op, dest }
                }
                None if raw.sub_asset => AssetKind::Marker,
                None => {
                    return Err(SchemaError::InvalidAsset(format!(
                        "{} asset '{source}' has no dest",
                        raw.kind
                    )));
                }
            },
            ("icon", None) => AssetKind::Icon,
            ("screenshot", None) => AssetKind::Screenshot,
            ("zip" | "archive", None) => {
                if raw.dest.is_some() {
                    return Err(SchemaError::InvalidAsset(format!(
                        "archive asset '{source}' must not declare a dest"
                    )));
                }
                let entries = raw
                    .zip
                    .into_iter()
                    .map(|entry| {
                        if let Some(path) = &entry.path {
                            check_relative(path)?;
                        }
                        Asset::try_from(entry)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                AssetKind::Archive { entries }
            }
            (tag, None) => AssetKind::Unknown {
                tag: tag.to_string(),
            },
        };

        Ok(Self {
            source,
            marker: raw.sub_asset,
            kind,
        })
    }
}

// Names become file and directory names under the output root.
fn check_name(name: &PackageName) -> Result<(), SchemaError> {
    let mut components = Path::new(name.as_str()).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(SchemaError::InvalidName(name.to_string())),
    }
}

fn check_relative(path: &str) -> Result<(), SchemaError> {
    if Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(SchemaError::InvalidAsset(format!(
            "path '{path}' escapes its root"
        )));
    }
    Ok(())
}
