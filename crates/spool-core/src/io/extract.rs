//! Archive extraction module
//!
//! Expands zip assets into scratch directories.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Extract every entry of a zip archive below `dest_dir`, returning the
/// relative paths of the extracted files.
///
/// Directory entries create directories; file entries are copied verbatim.
/// Entries whose names would escape `dest_dir` are skipped.
pub fn extract_zip<R: Read + Seek>(reader: R, dest_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut archive = ZipArchive::new(reader)?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let relative_path = match file.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                tracing::warn!(name = file.name(), "skipping unsafe archive entry");
                continue;
            }
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        extracted_files.push(relative_path);
    }

    Ok(extracted_files)
}
