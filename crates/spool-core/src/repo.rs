//! Repository build: output location, package discovery and the index.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use spool_schema::{DESCRIPTOR_FILE, INDEX_FILE, PackageRecord, RepoIndex};

use crate::Reporter;
use crate::builder::{BuildContext, BuildOutcome, build_package};
use crate::config::Config;
use crate::error::RepoError;
use crate::io::fetch::Fetcher;

/// Options for one repository build.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding the package directories.
    pub root: PathBuf,
    /// Build only this package directory.
    pub filter: Option<String>,
    /// Ignore the previous index and rebuild everything.
    pub full: bool,
}

/// Counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Records written to the index.
    pub published: usize,
    pub index_path: PathBuf,
}

/// Validate the output location and load the previous index.
///
/// An absent directory is created. An empty directory has no previous
/// index.
///
/// # Errors
///
/// Returns [`RepoError::OutputConflict`] when the directory has content but
/// no readable `repo.json`.
pub fn prepare_output(output: &Path) -> Result<Option<RepoIndex>, RepoError> {
    let io_err = |source| RepoError::Output {
        path: output.to_path_buf(),
        source,
    };

    if !output.exists() {
        fs::create_dir_all(output).map_err(io_err)?;
        return Ok(None);
    }

    if fs::read_dir(output).map_err(io_err)?.next().is_none() {
        return Ok(None);
    }

    match RepoIndex::load(&output.join(INDEX_FILE)) {
        Ok(index) => Ok(Some(index)),
        Err(e) => {
            tracing::debug!(error = %e, "no usable index in output directory");
            Err(RepoError::OutputConflict(output.to_path_buf()))
        }
    }
}

/// Directory names under `root` that contain a package descriptor, sorted,
/// minus the configured ignored names.
///
/// # Errors
///
/// Returns [`RepoError::Discovery`] if `root` cannot be listed.
pub fn discover_packages(root: &Path, config: &Config) -> Result<Vec<String>, RepoError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(RepoError::Discovery)? {
        let entry = entry.map_err(RepoError::Discovery)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if config.is_ignored(&name) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() && path.join(DESCRIPTOR_FILE).is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Collects package records into the new index in processing order.
#[derive(Debug, Default)]
pub struct Aggregator {
    index: RepoIndex,
    carry_forward: bool,
    built: usize,
    skipped: usize,
    failed: usize,
}

impl Aggregator {
    /// With `carry_forward`, skipped packages keep their previous record.
    pub fn new(carry_forward: bool) -> Self {
        Self {
            carry_forward,
            ..Self::default()
        }
    }

    /// Account for one package build.
    pub fn record(&mut self, outcome: BuildOutcome) {
        match outcome {
            BuildOutcome::Built(record) => {
                self.built += 1;
                self.index.push(record);
            }
            BuildOutcome::Skipped(previous) => {
                self.skipped += 1;
                if self.carry_forward {
                    self.index.push(previous);
                }
            }
        }
    }

    /// Keep a record for a package that was not selected in this run.
    pub fn retain(&mut self, record: PackageRecord) {
        self.index.push(record);
    }

    /// Account for a failed package; it contributes no record.
    pub fn fail(&mut self) {
        self.failed += 1;
    }

    /// The assembled index and the run counts.
    pub fn finish(self, index_path: PathBuf) -> (RepoIndex, RunSummary) {
        let summary = RunSummary {
            built: self.built,
            skipped: self.skipped,
            failed: self.failed,
            published: self.index.len(),
            index_path,
        };
        (self.index, summary)
    }
}

/// Build every package under `opts.root` and write the repository index.
///
/// Packages are built one at a time. Package failures are reported and the
/// run continues; a `--package` run keeps the previous records of the
/// packages it did not select.
///
/// # Errors
///
/// Returns [`RepoError`] when the output location is unusable, packages
/// cannot be listed, or the index cannot be written.
pub async fn build_repository(
    opts: &RunOptions,
    config: &Config,
    reporter: Arc<dyn Reporter>,
) -> Result<RunSummary, RepoError> {
    let start = Instant::now();
    let output = opts.root.join(&config.output_directory);

    let previous = prepare_output(&output)?;
    let previous = if opts.full { None } else { previous };
    match &previous {
        Some(index) => reporter.info(&format!(
            "loaded existing index ({} packages)",
            index.len()
        )),
        None => reporter.info("no previous index, building every package"),
    }

    let names = discover_packages(&opts.root, config)?;
    let selected: Vec<&String> = names
        .iter()
        .filter(|n| opts.filter.as_ref().is_none_or(|f| *n == f))
        .collect();
    if let Some(filter) = &opts.filter {
        if selected.is_empty() {
            reporter.warning(&format!("no package named '{filter}'"));
        }
    }

    reporter.section("Packages");
    reporter.info(&format!(
        "found {} package(s): {}",
        selected.len(),
        selected
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));

    let scratch_parent = config.scratch_parent(&opts.root);
    let fetcher = Fetcher::new(Client::builder().build()?, &scratch_parent).map_err(|source| {
        RepoError::Scratch {
            path: scratch_parent.clone(),
            source,
        }
    })?;
    let ctx = BuildContext {
        config,
        output: &output,
        previous: previous.as_ref(),
        fetcher: &fetcher,
        reporter: reporter.as_ref(),
    };

    let mut aggregator = Aggregator::new(config.carry_forward_skipped);
    for name in &names {
        if opts.filter.as_ref().is_some_and(|f| f != name) {
            if let Some(record) = previous.as_ref().and_then(|p| p.find(name)) {
                aggregator.retain(record.clone());
            }
            continue;
        }

        match build_package(&ctx, &opts.root.join(name)).await {
            Ok(outcome) => aggregator.record(outcome),
            Err(e) => {
                tracing::debug!(package = %name, error = ?e, "package failed");
                reporter.failed(name, &e.to_string());
                aggregator.fail();
            }
        }
    }

    let index_path = output.join(INDEX_FILE);
    let (index, summary) = aggregator.finish(index_path.clone());
    index.save(&index_path).map_err(RepoError::IndexWrite)?;
    tracing::debug!(path = %index_path.display(), packages = index.len(), "index written");

    reporter.section("Summary");
    reporter.summary(
        summary.built,
        summary.skipped,
        summary.failed,
        start.elapsed().as_secs_f64(),
    );
    Ok(summary)
}
