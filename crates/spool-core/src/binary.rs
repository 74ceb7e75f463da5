//! Entry-point detection for package metadata.

use std::path::Path;

use spool_schema::PackageInfo;
use walkdir::WalkDir;

/// Category whose packages have no entry point.
pub const THEME_CATEGORY: &str = "theme";
/// Binary value recorded for themes.
pub const NO_BINARY: &str = "none";

/// How a package's binary path was determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryPath {
    /// Declared in the descriptor.
    Declared(String),
    /// Theme package; no binary.
    Theme,
    /// First matching file in the package tree.
    Detected(String),
    /// Nothing declared and nothing found.
    Missing,
}

impl BinaryPath {
    /// The value written to the metadata record.
    pub fn into_record_value(self) -> String {
        match self {
            Self::Declared(path) | Self::Detected(path) => path,
            Self::Theme => NO_BINARY.to_string(),
            Self::Missing => String::new(),
        }
    }
}

/// Determine the binary path for a package.
///
/// Detection walks `package_root` in file-name order and returns the first
/// regular file whose name ends with one of `extensions`, relative to
/// `package_root` with `/` separators.
pub fn detect_binary(info: &PackageInfo, package_root: &Path, extensions: &[String]) -> BinaryPath {
    if let Some(binary) = &info.binary {
        return BinaryPath::Declared(binary.clone());
    }
    if info.category == THEME_CATEGORY {
        return BinaryPath::Theme;
    }

    WalkDir::new(package_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            let name = e.file_name().to_string_lossy();
            extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        })
        .and_then(|e| {
            e.path().strip_prefix(package_root).ok().map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
        })
        .map_or(BinaryPath::Missing, BinaryPath::Detected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn info(category: &str, binary: Option<&str>) -> PackageInfo {
        let binary = binary.map_or(String::new(), |b| format!(r#", "binary": "{b}""#));
        serde_json::from_str(&format!(
            r#"{{"title": "T", "category": "{category}", "version": "1"{binary}}}"#
        ))
        .unwrap()
    }

    fn extensions() -> Vec<String> {
        vec![".nro".to_string(), ".elf".to_string()]
    }

    #[test]
    fn test_declared_binary_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.nro"), b"x").unwrap();
        let path = detect_binary(&info("theme", Some("/switch/x.nro")), dir.path(), &extensions());
        assert_eq!(path, BinaryPath::Declared("/switch/x.nro".to_string()));
    }

    #[test]
    fn test_theme_has_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.nro"), b"x").unwrap();
        let path = detect_binary(&info("theme", None), dir.path(), &extensions());
        assert_eq!(path.into_record_value(), "none");
    }

    #[test]
    fn test_detects_first_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("switch/app")).unwrap();
        fs::write(dir.path().join("switch/app/app.nro"), b"x").unwrap();
        fs::write(dir.path().join("switch/app/zz.elf"), b"x").unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let path = detect_binary(&info("tool", None), dir.path(), &extensions());
        assert_eq!(path, BinaryPath::Detected("switch/app/app.nro".to_string()));
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), b"x").unwrap();
        let path = detect_binary(&info("tool", None), dir.path(), &extensions());
        assert_eq!(path, BinaryPath::Missing);
        assert_eq!(path.into_record_value(), "");
    }
}
