//! Source fetching: turns an asset's declared source into a seekable byte
//! source.
//!
//! Sources that name an existing file are opened in place. Anything else is
//! treated as a URL and streamed into a temporary file. Temporary files and
//! archive scratch directories live under a per-run scratch root and are
//! removed when their owning handle is dropped.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0} not found in archive")]
    MissingEntry(PathBuf),
}

/// Fetched asset bytes, positioned at offset 0.
#[derive(Debug)]
pub enum ByteSource {
    /// A file opened in place.
    Local { file: File, path: PathBuf },
    /// A download held in a temporary file, deleted on drop.
    Downloaded(NamedTempFile),
}

impl ByteSource {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = File::open(&path)?;
        Ok(Self::Local { file, path })
    }

    /// Where the bytes live on disk.
    pub fn path(&self) -> &Path {
        match self {
            Self::Local { path, .. } => path,
            Self::Downloaded(tmp) => tmp.path(),
        }
    }

    /// Whether the bytes were read from an existing file rather than downloaded.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Seek back to the first byte.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    fn file(&mut self) -> &mut File {
        match self {
            Self::Local { file, .. } => file,
            Self::Downloaded(tmp) => tmp.as_file_mut(),
        }
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file().read(buf)
    }
}

impl Seek for ByteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file().seek(pos)
    }
}

/// Resolves asset sources to bytes.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    scratch: TempDir,
}

impl Fetcher {
    /// Create a fetcher whose scratch root is a fresh directory under `scratch_parent`.
    pub fn new(client: Client, scratch_parent: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(scratch_parent)?;
        let scratch = tempfile::Builder::new()
            .prefix("spool-")
            .tempdir_in(scratch_parent)?;
        Ok(Self { client, scratch })
    }

    /// The per-run scratch root.
    pub fn scratch_root(&self) -> &Path {
        self.scratch.path()
    }

    /// Create a scratch directory for expanding one archive.
    pub fn scratch_dir(&self) -> io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix("zip_extract_")
            .tempdir_in(self.scratch.path())
    }

    /// Produce the bytes named by `source`.
    ///
    /// A source inside the scratch root is an extracted archive entry and is
    /// always local. Otherwise the source is looked up under `package_root`
    /// and, failing that, downloaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, the download fails,
    /// or an extracted entry is missing.
    pub async fn fetch(&self, source: &str, package_root: &Path) -> Result<ByteSource, FetchError> {
        let as_path = Path::new(source);
        if as_path.starts_with(self.scratch.path()) {
            if !as_path.is_file() {
                return Err(FetchError::MissingEntry(as_path.to_path_buf()));
            }
            return Ok(ByteSource::open(as_path.to_path_buf())?);
        }

        let local = package_root.join(relative(source));
        if local.is_file() {
            tracing::debug!(path = %local.display(), "asset is local");
            return Ok(ByteSource::open(local)?);
        }

        self.download(source).await
    }

    async fn download(&self, url: &str) -> Result<ByteSource, FetchError> {
        tracing::debug!(url, "downloading asset");

        let response = self.client.get(url).send().await?.error_for_status()?;

        let tmp = tempfile::Builder::new()
            .prefix("asset_")
            .tempfile_in(self.scratch.path())?;
        let mut file = tokio::fs::File::from_std(tmp.reopen()?);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await?;
        tracing::debug!(url, bytes = downloaded, "download complete");

        let mut source = ByteSource::Downloaded(tmp);
        source.rewind()?;
        Ok(source)
    }
}

/// Strip root and prefix components so `path` can be joined under another
/// directory (`/switch/app.nro` becomes `switch/app.nro`).
pub fn relative(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .collect()
}
