//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific console or log sink.

use spool_schema::{PackageName, Version};

/// Progress sink for a repository build.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Packages", "Summary").
    fn section(&self, title: &str);

    /// A package build has started.
    fn package(&self, name: &PackageName, version: &Version, assets: usize);

    /// An asset is being handled; `detail` describes where it goes.
    fn asset(&self, kind: &str, detail: &str);

    /// A package was skipped because its version is unchanged.
    fn skipped(&self, name: &PackageName, version: &Version);

    /// Marks a package as successfully built.
    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>);

    /// Marks a package as failed with a specific reason.
    fn failed(&self, package: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display the final counts for the run.
    fn summary(&self, built: usize, skipped: usize, failed: usize, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn package(&self, name: &PackageName, version: &Version, assets: usize) {
        (**self).package(name, version, assets);
    }
    fn asset(&self, kind: &str, detail: &str) {
        (**self).asset(kind, detail);
    }
    fn skipped(&self, name: &PackageName, version: &Version) {
        (**self).skipped(name, version);
    }
    fn done(&self, name: &PackageName, version: &Version, detail: &str, size: Option<u64>) {
        (**self).done(name, version, detail, size);
    }
    fn failed(&self, package: &str, reason: &str) {
        (**self).failed(package, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, built: usize, skipped: usize, failed: usize, elapsed_secs: f64) {
        (**self).summary(built, skipped, failed, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn package(&self, _: &PackageName, _: &Version, _: usize) {}
    fn asset(&self, _: &str, _: &str) {}
    fn skipped(&self, _: &PackageName, _: &Version) {}
    fn done(&self, _: &PackageName, _: &Version, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: usize, _: f64) {}
}

/// Reporter that keeps warnings and errors for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    pub(crate) warnings: std::sync::Mutex<Vec<String>>,
    pub(crate) errors: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub(crate) fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn section(&self, _: &str) {}
    fn package(&self, _: &PackageName, _: &Version, _: usize) {}
    fn asset(&self, _: &str, _: &str) {}
    fn skipped(&self, _: &PackageName, _: &Version) {}
    fn done(&self, _: &PackageName, _: &Version, _: &str, _: Option<u64>) {}
    fn failed(&self, package: &str, reason: &str) {
        self.errors
            .lock()
            .unwrap()
            .push(format!("{package}: {reason}"));
    }
    fn info(&self, _: &str) {}
    fn warning(&self, msg: &str) {
        self.warnings.lock().unwrap().push(msg.to_string());
    }
    fn error(&self, msg: &str) {
        self.errors.lock().unwrap().push(msg.to_string());
    }
    fn summary(&self, _: usize, _: usize, _: usize, _: f64) {}
}
