//! Console progress output.

use spool_core::Reporter;
use spool_schema::{PackageName, Version};

/// Prints build progress as indented lines.
///
/// Progress goes to stdout, warnings and errors to stderr. Every event is
/// also emitted at `debug` level through `tracing` so that `RUST_LOG=debug`
/// interleaves it with the core's own diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.to_lowercase());
    }

    fn package(&self, name: &PackageName, version: &Version, assets: usize) {
        tracing::debug!(package = %name, version = %version, assets, "building");
        println!("  {name} {version}");
        println!("    {assets} asset(s)");
    }

    fn asset(&self, kind: &str, detail: &str) {
        tracing::debug!(kind, detail, "asset");
        println!("    {kind}: {detail}");
    }

    fn skipped(&self, name: &PackageName, version: &Version) {
        tracing::debug!(package = %name, version = %version, "unchanged");
        println!("  {name} {version} unchanged, skipping");
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>) {
        tracing::debug!(package = %name, version = %version, detail, size, "built");
        match size {
            Some(kib) => println!("    built {detail} ({kib} KiB)"),
            None => println!("    built {detail}"),
        }
    }

    fn failed(&self, package: &str, reason: &str) {
        tracing::debug!(package, reason, "failed");
        eprintln!("  error: {package}: {reason}");
    }

    fn info(&self, msg: &str) {
        println!("  {msg}");
    }

    fn warning(&self, msg: &str) {
        tracing::debug!(msg, "warning");
        eprintln!("  warning: {msg}");
    }

    fn error(&self, msg: &str) {
        tracing::debug!(msg, "error");
        eprintln!("  error: {msg}");
    }

    fn summary(&self, built: usize, skipped: usize, failed: usize, elapsed_secs: f64) {
        println!("  {built} built, {skipped} unchanged, {failed} failed in {elapsed_secs:.1}s");
    }
}
