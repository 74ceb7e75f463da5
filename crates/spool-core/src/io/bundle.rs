//! Package archiving.
//!
//! Bundles a package directory into a zip whose bytes depend only on the
//! tree's paths and contents: entries are sorted, timestamps are pinned to
//! the zip epoch and permissions are normalised.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Zip every file under `src_dir` into `dest_archive`, naming entries by
/// their path relative to `src_dir`. Returns the number of entries written.
pub fn zip_directory(src_dir: &Path, dest_archive: &Path) -> Result<usize, BundleError> {
    let file = File::create(dest_archive)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut count = 0;
    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.path() == dest_archive {
            continue;
        }

        let name = entry_name(entry.path().strip_prefix(src_dir).unwrap_or(entry.path()));
        zip.start_file(name, options)?;
        let mut input = File::open(entry.path())?;
        io::copy(&mut input, &mut zip)?;
        count += 1;
    }

    zip.finish()?;
    Ok(count)
}

/// Total size in bytes of every file under `dir`.
pub fn dir_size(dir: &Path) -> Result<u64, BundleError> {
    let mut size = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            size += entry.metadata()?.len();
        }
    }
    Ok(size)
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::extract::extract_zip;
    use std::fs;

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("switch/app")).unwrap();
        fs::write(dir.path().join("switch/app/app.nro"), b"NRO0 binary").unwrap();
        fs::write(dir.path().join("manifest.install"), b"G: /switch/app/app.nro\n").unwrap();
        fs::write(dir.path().join("info.json"), b"{}").unwrap();
        dir
    }

    #[test]
    fn test_round_trip_reproduces_tree() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let zip_path = out.path().join("app.zip");

        assert_eq!(zip_directory(tree.path(), &zip_path).unwrap(), 3);

        let unpacked = tempfile::tempdir().unwrap();
        let mut files = extract_zip(File::open(&zip_path).unwrap(), unpacked.path()).unwrap();
        files.sort();
        let names: Vec<String> = files.iter().map(|p| entry_name(p)).collect();
        assert_eq!(
            names,
            vec!["info.json", "manifest.install", "switch/app/app.nro"]
        );
        for name in &names {
            assert_eq!(
                fs::read(tree.path().join(name)).unwrap(),
                fs::read(unpacked.path().join(name)).unwrap()
            );
        }
    }

    #[test]
    fn test_archive_is_deterministic() {
        let tree = sample_tree();
        let out = tempfile::tempdir().unwrap();
        let first = out.path().join("first.zip");
        let second = out.path().join("second.zip");

        zip_directory(tree.path(), &first).unwrap();
        zip_directory(tree.path(), &second).unwrap();

        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn test_dir_size() {
        let tree = sample_tree();
        assert_eq!(dir_size(tree.path()).unwrap(), 11 + 23 + 2);
    }
}
