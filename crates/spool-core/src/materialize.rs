//! Asset materialization: writes fetched bytes to their destinations.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use spool_schema::{Asset, AssetKind, InstallOp};

use crate::Reporter;
use crate::error::AssetError;
use crate::io::fetch::{ByteSource, relative};
use crate::manifest::InstallManifest;

/// File name of the package icon, in the package tree and the published copy.
pub const ICON_FILE: &str = "icon.png";
/// File name of the package screenshot.
pub const SCREENSHOT_FILE: &str = "screen.png";

/// Writes assets into one package's tree and its published directory.
pub struct Materializer<'a> {
    package_root: &'a Path,
    publish_dir: PathBuf,
    reporter: &'a dyn Reporter,
}

impl<'a> Materializer<'a> {
    /// `publish_dir` receives duplicated icons and screenshots
    /// (`<output>/packages/<name>`).
    pub fn new(package_root: &'a Path, publish_dir: PathBuf, reporter: &'a dyn Reporter) -> Self {
        Self {
            package_root,
            publish_dir,
            reporter,
        }
    }

    /// Write `source` to the destination(s) required by the asset's kind.
    ///
    /// Install kinds append one manifest line after a successful write;
    /// icons and screenshots never touch the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Write`] when a destination cannot be written,
    /// [`AssetError::Conflict`] when a published duplicate already exists, and
    /// [`AssetError::UnknownType`] for kinds that have no destination.
    pub fn materialize(
        &self,
        source: &mut ByteSource,
        asset: &Asset,
        manifest: &mut InstallManifest,
    ) -> Result<(), AssetError> {
        match &asset.kind {
            AssetKind::Install { op, dest } => self.install(source, *op, dest, manifest),
            AssetKind::Icon => self.publish(source, ICON_FILE),
            AssetKind::Screenshot => self.publish(source, SCREENSHOT_FILE),
            AssetKind::Archive { .. } | AssetKind::Marker | AssetKind::Unknown { .. } => {
                Err(AssetError::UnknownType(asset.type_name().to_string()))
            }
        }
    }

    fn install(
        &self,
        source: &mut ByteSource,
        op: InstallOp,
        dest: &str,
        manifest: &mut InstallManifest,
    ) -> Result<(), AssetError> {
        self.reporter
            .asset(op.as_str(), &format!("moving to /{}", relative(dest).display()));

        let dest_path = self.package_root.join(relative(dest));
        if is_same_file(source, &dest_path) {
            tracing::debug!(path = %dest_path.display(), "asset already in place");
        } else {
            write_from(source, &dest_path).map_err(|e| AssetError::write(&dest_path, e))?;
        }

        if let Err(e) = manifest.record(op, dest) {
            return Err(AssetError::write(manifest.path(), e));
        }
        Ok(())
    }

    fn publish(&self, source: &mut ByteSource, file_name: &str) -> Result<(), AssetError> {
        self.reporter
            .asset(file_name, &format!("moving to /{file_name}"));

        let local = self.package_root.join(file_name);
        if !is_same_file(source, &local) {
            write_from(source, &local).map_err(|e| AssetError::write(&local, e))?;
        }

        let published = self.publish_dir.join(file_name);
        copy_new(&local, &published)
    }
}

/// Copy `source` into `dest`, creating parent directories first.
fn write_from(source: &mut ByteSource, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    source.rewind()?;
    let mut out = File::create(dest)?;
    io::copy(source, &mut out)
}

/// Copy a regular file to a path that must not exist yet.
fn copy_new(src: &Path, dest: &Path) -> Result<(), AssetError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| AssetError::write(dest, e))?;
    }

    let mut out = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(AssetError::Conflict(dest.to_path_buf()));
        }
        Err(e) => return Err(AssetError::write(dest, e)),
    };

    let mut input = File::open(src).map_err(|e| AssetError::write(src, e))?;
    io::copy(&mut input, &mut out).map_err(|e| AssetError::write(dest, e))?;
    Ok(())
}

fn is_same_file(source: &ByteSource, dest: &Path) -> bool {
    if !source.is_local() {
        return false;
    }
    match (source.path().canonicalize(), dest.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
