//! Incremental build guard.
//!
//! A package is rebuilt unless the previously published index lists the
//! same name with exactly the same version string. Content is not hashed:
//! changed assets behind an unchanged version are not noticed.

use spool_schema::{PackageDescriptor, PackageRecord, RepoIndex};

/// The previously published record for `candidate`, if its version is unchanged.
pub fn unchanged<'a>(
    candidate: &PackageDescriptor,
    previous: &'a RepoIndex,
) -> Option<&'a PackageRecord> {
    previous
        .find(candidate.name.as_str())
        .filter(|record| record.version().as_str() == candidate.info.version.as_str())
}

/// Whether `candidate` can be skipped.
pub fn should_skip(candidate: &PackageDescriptor, previous: &RepoIndex) -> bool {
    unchanged(candidate, previous).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, version: &str) -> PackageDescriptor {
        PackageDescriptor::parse(&format!(
            r#"{{"package": "{name}", "info": {{"title": "T", "category": "tool", "version": "{version}"}}}}"#
        ))
        .unwrap()
    }

    fn previous() -> RepoIndex {
        RepoIndex::from_json(
            r#"{"packages": [
                {"name": "foo", "version": "1.0"},
                {"name": "bar", "version": "2.0.0"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_same_version_skips() {
        assert!(should_skip(&descriptor("foo", "1.0"), &previous()));
    }

    #[test]
    fn test_new_version_rebuilds() {
        assert!(!should_skip(&descriptor("foo", "1.1"), &previous()));
    }

    #[test]
    fn test_comparison_is_not_semantic() {
        assert!(!should_skip(&descriptor("foo", "1.0.0"), &previous()));
        assert!(!should_skip(&descriptor("bar", "v2.0.0"), &previous()));
    }

    #[test]
    fn test_unknown_package_builds() {
        assert!(!should_skip(&descriptor("baz", "1.0"), &previous()));
        assert!(!should_skip(&descriptor("foo", "1.0"), &RepoIndex::new()));
    }

    #[test]
    fn test_unchanged_returns_previous_record() {
        let prev = previous();
        let record = unchanged(&descriptor("bar", "2.0.0"), &prev).unwrap();
        assert_eq!(record.name().as_str(), "bar");
    }
}
