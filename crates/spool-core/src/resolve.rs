//! Recursive asset resolution.
//!
//! Each asset is fetched and either materialized or, for archives, expanded
//! into a scratch directory whose declared entries are resolved in turn.
//! Nested archives recurse depth-first; a failed entry is reported and its
//! siblings continue.

use std::path::Path;

use spool_schema::{Asset, AssetKind};

use crate::Reporter;
use crate::config::{Config, MarkerPolicy};
use crate::error::AssetError;
use crate::io::extract::extract_zip;
use crate::io::fetch::{ByteSource, Fetcher, relative};
use crate::manifest::InstallManifest;
use crate::materialize::Materializer;

/// Resolves one package's asset tree.
pub struct AssetResolver<'a> {
    package_root: &'a Path,
    fetcher: &'a Fetcher,
    materializer: Materializer<'a>,
    marker_policy: MarkerPolicy,
    reporter: &'a dyn Reporter,
}

impl<'a> AssetResolver<'a> {
    /// Create a resolver for the package at `package_root`.
    pub fn new(
        package_root: &'a Path,
        materializer: Materializer<'a>,
        fetcher: &'a Fetcher,
        config: &Config,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            package_root,
            fetcher,
            materializer,
            marker_policy: config.nested_marker,
            reporter,
        }
    }

    /// Resolve `asset` and everything nested inside it.
    ///
    /// # Errors
    ///
    /// Returns the failure of this asset itself. Failures of entries nested
    /// in an archive are reported and do not fail the archive.
    pub async fn resolve(
        &self,
        asset: &Asset,
        manifest: &mut InstallManifest,
    ) -> Result<(), AssetError> {
        if asset.marker && self.marker_policy == MarkerPolicy::Skip
            || asset.kind == AssetKind::Marker
        {
            self.reporter.asset("subasset", &asset.source);
            return Ok(());
        }
        if let AssetKind::Unknown { tag } = &asset.kind {
            return Err(AssetError::UnknownType(tag.clone()));
        }

        let mut source = self.fetcher.fetch(&asset.source, self.package_root).await?;
        self.reporter.asset(
            asset.type_name(),
            if source.is_local() { "local" } else { "downloaded" },
        );

        match &asset.kind {
            AssetKind::Archive { entries } => self.expand(&mut source, entries, manifest).await,
            _ => self.materializer.materialize(&mut source, asset, manifest),
        }
    }

    async fn expand(
        &self,
        archive: &mut ByteSource,
        entries: &[Asset],
        manifest: &mut InstallManifest,
    ) -> Result<(), AssetError> {
        self.reporter
            .asset("zip", &format!("has {} sub-asset(s)", entries.len()));

        let scratch = self
            .fetcher
            .scratch_dir()
            .map_err(|e| AssetError::write(self.fetcher.scratch_root(), e))?;
        archive
            .rewind()
            .map_err(|e| AssetError::write(archive.path(), e))?;
        let extracted = extract_zip(&mut *archive, scratch.path())?;
        tracing::debug!(
            files = extracted.len(),
            dir = %scratch.path().display(),
            "archive extracted"
        );

        for entry in entries {
            let mut nested = entry.clone();
            nested.source = scratch
                .path()
                .join(relative(&entry.source))
                .to_string_lossy()
                .into_owned();

            if let Err(e) = Box::pin(self.resolve(&nested, manifest)).await {
                self.reporter
                    .error(&format!("failed to resolve {}: {e}", entry.source));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use crate::reporter::RecordingReporter;
    use reqwest::Client;
    use std::fs;
    use std::io::{Cursor, Write};

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn assets(json: &str) -> Vec<Asset> {
        serde_json::from_str(json).unwrap()
    }

    struct Harness {
        pkg: tempfile::TempDir,
        out: tempfile::TempDir,
        fetcher: Fetcher,
        _scratch_parent: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let scratch_parent = tempfile::tempdir().unwrap();
            Self {
                pkg: tempfile::tempdir().unwrap(),
                out: tempfile::tempdir().unwrap(),
                fetcher: Fetcher::new(Client::new(), scratch_parent.path()).unwrap(),
                _scratch_parent: scratch_parent,
            }
        }

        async fn run(&self, list: &[Asset], config: &Config, reporter: &dyn Reporter) -> String {
            let materializer = Materializer::new(
                self.pkg.path(),
                self.out.path().join("packages/demo"),
                reporter,
            );
            let resolver =
                AssetResolver::new(self.pkg.path(), materializer, &self.fetcher, config, reporter);
            let mut manifest = InstallManifest::create(self.pkg.path()).unwrap();
            for asset in list {
                if let Err(e) = resolver.resolve(asset, &mut manifest).await {
                    reporter.error(&e.to_string());
                }
            }
            manifest.finish().unwrap();
            fs::read_to_string(self.pkg.path().join("manifest.install")).unwrap()
        }
    }

    #[tokio::test]
    async fn test_archive_entries_resolve_in_order() {
        let h = Harness::new();
        fs::write(
            h.pkg.path().join("bundle.zip"),
            zip_bytes(&[("bin/app.nro", b"app"), ("cfg/app.ini", b"ini")]),
        )
        .unwrap();

        let list = assets(
            r#"[{"type": "zip", "url": "bundle.zip", "zip": [
                {"type": "get", "path": "bin/app.nro", "dest": "/switch/app.nro"},
                {"type": "update", "path": "cfg/app.ini", "dest": "/config/app.ini"}
            ]}]"#,
        );
        let manifest = h.run(&list, &Config::default(), &NullReporter).await;

        assert_eq!(manifest, "G: /switch/app.nro\nU: /config/app.ini\n");
        assert_eq!(fs::read(h.pkg.path().join("switch/app.nro")).unwrap(), b"app");
        assert_eq!(fs::read(h.pkg.path().join("config/app.ini")).unwrap(), b"ini");
        assert_eq!(fs::read_dir(h.fetcher.scratch_root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remote_archive_downloaded_then_expanded() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/releases/bundle.zip")
            .with_status(200)
            .with_body(zip_bytes(&[("bin/app.nro", b"remote app")]))
            .create_async()
            .await;

        let h = Harness::new();
        let list = assets(&format!(
            r#"[{{"type": "zip", "url": "{}/releases/bundle.zip", "zip": [
                {{"type": "update", "path": "bin/app.nro", "dest": "/switch/app.nro"}}
            ]}}]"#,
            server.url()
        ));
        let reporter = RecordingReporter::default();
        let manifest = h.run(&list, &Config::default(), &reporter).await;

        assert_eq!(manifest, "U: /switch/app.nro\n");
        assert_eq!(
            fs::read(h.pkg.path().join("switch/app.nro")).unwrap(),
            b"remote app"
        );
        assert!(reporter.errors().is_empty());
        assert_eq!(fs::read_dir(h.fetcher.scratch_root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_nested_archive_depth_first() {
        let h = Harness::new();
        let inner = zip_bytes(&[("deep.bin", b"deep")]);
        fs::write(
            h.pkg.path().join("outer.zip"),
            zip_bytes(&[("inner.zip", &inner), ("top.bin", b"top")]),
        )
        .unwrap();
        fs::write(h.pkg.path().join("last.bin"), b"last").unwrap();

        let list = assets(
            r#"[
                {"type": "zip", "url": "outer.zip", "zip": [
                    {"type": "zip", "path": "inner.zip", "zip": [
                        {"type": "extract", "path": "deep.bin", "dest": "/deep.bin"}
                    ]},
                    {"type": "get", "path": "top.bin", "dest": "/top.bin"}
                ]},
                {"type": "local", "url": "last.bin", "dest": "/last.bin"}
            ]"#,
        );
        let manifest = h.run(&list, &Config::default(), &NullReporter).await;

        assert_eq!(manifest, "E: /deep.bin\nG: /top.bin\nL: /last.bin\n");
        assert_eq!(fs::read_dir(h.fetcher.scratch_root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_entry_does_not_stop_siblings() {
        let h = Harness::new();
        fs::write(h.pkg.path().join("b.zip"), zip_bytes(&[("ok.bin", b"ok")])).unwrap();

        let list = assets(
            r#"[{"type": "zip", "url": "b.zip", "zip": [
                {"type": "get", "path": "missing.bin", "dest": "/missing.bin"},
                {"type": "get", "path": "ok.bin", "dest": "/ok.bin"}
            ]}]"#,
        );
        let reporter = RecordingReporter::default();
        let manifest = h.run(&list, &Config::default(), &reporter).await;

        assert_eq!(manifest, "G: /ok.bin\n");
        assert_eq!(reporter.errors().len(), 1);
        assert!(reporter.errors()[0].contains("missing.bin"));
    }

    #[tokio::test]
    async fn test_corrupt_archive_skips_whole_asset() {
        let h = Harness::new();
        fs::write(h.pkg.path().join("bad.zip"), b"not a zip").unwrap();
        fs::write(h.pkg.path().join("next.bin"), b"next").unwrap();

        let list = assets(
            r#"[
                {"type": "zip", "url": "bad.zip", "zip": [
                    {"type": "get", "path": "a.bin", "dest": "/a.bin"}
                ]},
                {"type": "get", "url": "next.bin", "dest": "/next.bin"}
            ]"#,
        );
        let reporter = RecordingReporter::default();
        let manifest = h.run(&list, &Config::default(), &reporter).await;

        assert_eq!(manifest, "G: /next.bin\n");
        assert_eq!(reporter.errors().len(), 1);
        assert_eq!(fs::read_dir(h.fetcher.scratch_root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_type_reported() {
        let h = Harness::new();
        fs::write(h.pkg.path().join("a.rar"), b"rar").unwrap();

        let list = assets(r#"[{"type": "rar", "url": "a.rar", "dest": "/a.rar"}]"#);
        let reporter = RecordingReporter::default();
        let manifest = h.run(&list, &Config::default(), &reporter).await;

        assert_eq!(manifest, "");
        assert!(reporter.errors()[0].contains("unknown type 'rar'"));
    }

    #[tokio::test]
    async fn test_marker_policy() {
        let list = assets(
            r#"[{"type": "get", "url": "m.bin", "dest": "/m.bin", "subAsset": true}]"#,
        );

        let skip = Harness::new();
        fs::write(skip.pkg.path().join("m.bin"), b"m").unwrap();
        let manifest = skip.run(&list, &Config::default(), &NullReporter).await;
        assert_eq!(manifest, "");

        let resolve = Harness::new();
        fs::write(resolve.pkg.path().join("m.bin"), b"m").unwrap();
        let config = Config {
            nested_marker: MarkerPolicy::Resolve,
            ..Config::default()
        };
        let manifest = resolve.run(&list, &config, &NullReporter).await;
        assert_eq!(manifest, "G: /m.bin\n");
    }
}
