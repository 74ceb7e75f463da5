//! Per-package build: descriptor, assets, metadata and archive.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use spool_schema::{
    PackageDescriptor, PackageRecord, PackageSummary, RepoIndex, UNTRACKED_DOWNLOADS,
};

use crate::Reporter;
use crate::binary::{BinaryPath, detect_binary};
use crate::config::Config;
use crate::error::BuildError;
use crate::guard;
use crate::io::bundle::{dir_size, zip_directory};
use crate::io::fetch::Fetcher;
use crate::manifest::InstallManifest;
use crate::materialize::Materializer;
use crate::resolve::AssetResolver;

/// File holding the descriptor-derived metadata in each package directory.
pub const INFO_FILE: &str = "info.json";
/// Output subdirectory for package archives.
pub const ZIPS_DIR: &str = "zips";
/// Output subdirectory for published icons and screenshots.
pub const PACKAGES_DIR: &str = "packages";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Shared, read-only state for every package build in a run.
pub struct BuildContext<'a> {
    pub config: &'a Config,
    pub output: &'a Path,
    pub previous: Option<&'a RepoIndex>,
    pub fetcher: &'a Fetcher,
    pub reporter: &'a dyn Reporter,
}

/// Result of building one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The package was built and produced a fresh record.
    Built(PackageRecord),
    /// The version is unchanged; holds the previously published record.
    Skipped(PackageRecord),
}

/// Build the package stored in `package_dir`.
///
/// Asset failures are reported and do not fail the package. An unchanged
/// version short-circuits before anything is written.
///
/// # Errors
///
/// Returns [`BuildError`] when the descriptor cannot be loaded, or when the
/// manifest, `info.json` or package archive cannot be written.
pub async fn build_package(
    ctx: &BuildContext<'_>,
    package_dir: &Path,
) -> Result<BuildOutcome, BuildError> {
    let descriptor = PackageDescriptor::load(package_dir)?;
    let name = &descriptor.name;
    let version = &descriptor.info.version;

    if let Some(previous) = ctx.previous.and_then(|p| guard::unchanged(&descriptor, p)) {
        tracing::debug!(package = %name, version = %version, "version unchanged");
        ctx.reporter.skipped(name, version);
        return Ok(BuildOutcome::Skipped(previous.clone()));
    }

    ctx.reporter.package(name, version, descriptor.assets.len());

    let mut manifest = InstallManifest::create(package_dir).map_err(BuildError::Manifest)?;
    let publish_dir = ctx.output.join(PACKAGES_DIR).join(name.as_str());
    let materializer = Materializer::new(package_dir, publish_dir, ctx.reporter);
    let resolver = AssetResolver::new(
        package_dir,
        materializer,
        ctx.fetcher,
        ctx.config,
        ctx.reporter,
    );

    for asset in &descriptor.assets {
        if let Err(e) = resolver.resolve(asset, &mut manifest).await {
            ctx.reporter
                .error(&format!("{} asset {}: {e}", asset.type_name(), asset.source));
        }
    }
    let lines = manifest.finish().map_err(BuildError::Manifest)?;
    tracing::debug!(package = %name, lines, "manifest written");

    let summary = summarize(&descriptor, ctx.reporter);
    write_info(&package_dir.join(INFO_FILE), &summary).map_err(BuildError::Info)?;

    let extracted = dir_size(package_dir)? / 1024;
    ctx.reporter.info(&format!("package size: {extracted} KiB"));

    let binary = detect_binary(
        &descriptor.info,
        package_dir,
        &ctx.config.valid_binary_extensions,
    );
    match &binary {
        BinaryPath::Detected(path) => ctx.reporter.warning(&format!(
            "binary path not specified in {}; guessing {path}",
            spool_schema::DESCRIPTOR_FILE
        )),
        BinaryPath::Missing => ctx.reporter.warning(&format!(
            "{}: binary path not specified and no binary found",
            descriptor.info.title
        )),
        BinaryPath::Declared(_) | BinaryPath::Theme => {}
    }

    let zips = ctx.output.join(ZIPS_DIR);
    fs::create_dir_all(&zips)?;
    let archive = zips.join(format!("{name}.zip"));
    let entries = zip_directory(package_dir, &archive)?;
    let filesize = fs::metadata(&archive)?.len() / 1024;
    tracing::debug!(archive = %archive.display(), entries, "package archived");

    ctx.reporter
        .done(name, version, &format!("{ZIPS_DIR}/{name}.zip"), Some(filesize));

    Ok(BuildOutcome::Built(PackageRecord {
        summary,
        extracted,
        filesize,
        binary: binary.into_record_value(),
        web_dls: UNTRACKED_DOWNLOADS,
        app_dls: UNTRACKED_DOWNLOADS,
    }))
}

fn summarize(descriptor: &PackageDescriptor, reporter: &dyn Reporter) -> PackageSummary {
    let info = &descriptor.info;

    let timestamp = info.timestamp.unwrap_or_else(|| {
        reporter.warning("no timestamp found, using the current time");
        Utc::now().timestamp()
    });
    let updated = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_else(Utc::now)
        .format(DATE_FORMAT)
        .to_string();

    if descriptor.changes.is_some() {
        reporter.warning("the `changes` field is deprecated, use `changelog` instead");
    }
    let changelog = descriptor.changelog_text().map(str::to_string);
    if changelog.is_none() {
        reporter.warning("no changelog found");
    }

    PackageSummary {
        name: descriptor.name.clone(),
        title: info.title.clone(),
        author: info.author.clone(),
        category: info.category.clone(),
        version: info.version.clone(),
        license: info.license.clone(),
        description: info.description.clone(),
        details: info.details.clone(),
        url: info.url.clone(),
        changelog,
        updated,
    }
}

fn write_info(path: &Path, summary: &PackageSummary) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
