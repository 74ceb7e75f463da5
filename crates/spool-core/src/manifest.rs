//! Install manifest (`manifest.install`).
//!
//! One line per installed asset, `<OPCODE>: <destination>`, in the order the
//! assets were resolved. The manifest is written once per build and consumed
//! by the on-device installer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use spool_schema::InstallOp;

/// File name of the install manifest inside each package directory.
pub const MANIFEST_FILE: &str = "manifest.install";

/// Format a single manifest line, including the trailing newline.
pub fn manifest_line(op: InstallOp, dest: &str) -> String {
    format!("{}: {dest}\n", op.opcode())
}

/// Append-only writer for a package's install manifest.
#[derive(Debug)]
pub struct InstallManifest {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: usize,
}

impl InstallManifest {
    /// Create (or truncate) the manifest in `package_root`.
    pub fn create(package_root: &Path) -> io::Result<Self> {
        let path = package_root.join(MANIFEST_FILE);
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Append one install operation.
    pub fn record(&mut self, op: InstallOp, dest: &str) -> io::Result<()> {
        self.writer.write_all(manifest_line(op, dest).as_bytes())?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the manifest, returning the line count.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.lines)
    }
}
