//! Fixture discovery and annotation scanning
//!
//! A fixture declares its expected output with a marker comment followed by
//! the value on the next line:
//!
//! ```c
//! // expected output
//! // 7
//! ```
//!
//! The marker is matched case-insensitively after trimming; the value line
//! has its leading comment token stripped and is trimmed.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Directory walked for fixtures
    pub root: PathBuf,

    /// Directory persisted source paths are made relative to
    pub test_root: PathBuf,

    /// Source extensions without the dot
    pub extensions: Vec<String>,

    /// Marker line announcing the expected output
    pub marker: String,

    /// Comment token stripped from the value line
    pub comment_token: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./tests/c"),
            test_root: PathBuf::from("./tests"),
            extensions: vec!["c".to_string()],
            marker: "// expected output".to_string(),
            comment_token: "//".to_string(),
        }
    }
}

/// Result of looking for the expected-output annotation in one fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Marker found, non-empty value
    Found(String),

    /// No marker, or the value line was empty
    Missing,

    /// Marker is the last line of the file (1-based line number)
    Dangling {
        /// Line of the marker
        line: usize,
    },

    /// The file could not be read
    Unreadable(String),
}

impl Annotation {
    /// Expected output, or `""` when the fixture is not usable
    #[inline]
    #[must_use]
    pub fn expected_output(&self) -> &str {
        match self {
            Self::Found(value) => value,
            _ => "",
        }
    }
}

/// A discovered source fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    /// Absolute path
    pub path: PathBuf,

    /// Path relative to the test root, `/`-separated
    pub source_file: String,

    /// Annotation scan result
    pub annotation: Annotation,
}

impl Fixture {
    /// Expected output, `""` if not annotated
    #[inline]
    #[must_use]
    pub fn expected_output(&self) -> &str {
        self.annotation.expected_output()
    }

    /// File name without extension
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// Extract the annotation from fixture text.
///
/// Only the first marker is considered.
#[must_use]
pub fn parse_annotation(text: &str, marker: &str, comment_token: &str) -> Annotation {
    let marker = marker.trim().to_lowercase();
    let lines: Vec<&str> = text.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().to_lowercase() != marker {
            continue;
        }
        let Some(next) = lines.get(idx + 1) else {
            return Annotation::Dangling { line: idx + 1 };
        };
        let mut value = next.trim();
        if !comment_token.is_empty() {
            value = value.trim_start_matches(comment_token).trim();
        }
        return if value.is_empty() {
            Annotation::Missing
        } else {
            Annotation::Found(value.to_string())
        };
    }

    Annotation::Missing
}

/// Walks a fixture tree and annotates each fixture
#[derive(Debug, Clone)]
pub struct FixtureScanner {
    settings: ScanSettings,
}

impl FixtureScanner {
    /// Create a scanner
    #[inline]
    #[must_use]
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }

    /// Scanner settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Find fixture files, sorted by path relative to the test root.
    ///
    /// Returns `(absolute path, relative path)` pairs. A fixture root outside
    /// the test root yields `../`-prefixed relative paths. Entries that cannot
    /// be walked are logged and skipped.
    ///
    /// # Errors
    /// - `ScanError::NoFixtures` if the root does not exist or nothing matches
    /// - `ScanError::Io` if the root exists but cannot be resolved
    pub fn discover(&self) -> Result<Vec<(PathBuf, String)>, ScanError> {
        let root = match self.settings.root.canonicalize() {
            Ok(root) => root,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.no_fixtures()),
            Err(e) => return Err(ScanError::io_error(&self.settings.root, e)),
        };
        let test_root = self
            .settings
            .test_root
            .canonicalize()
            .or_else(|_| std::path::absolute(&self.settings.test_root))
            .map_err(|e| ScanError::io_error(&self.settings.test_root, e))?;

        let mut found = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(path = ?e.path(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                continue;
            }
            let path = entry.into_path();
            let relative = relative_path(&path, &test_root);
            found.push((path, relative));
        }

        if found.is_empty() {
            return Err(self.no_fixtures());
        }

        found.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(found)
    }

    /// Discover fixtures and read their annotations.
    ///
    /// A fixture that cannot be read is returned with
    /// [`Annotation::Unreadable`] rather than failing the scan.
    ///
    /// # Errors
    /// Same as [`FixtureScanner::discover`].
    pub fn scan(&self) -> Result<Vec<Fixture>, ScanError> {
        let fixtures = self
            .discover()?
            .into_iter()
            .map(|(path, source_file)| {
                let annotation = match std::fs::read(&path) {
                    Ok(bytes) => parse_annotation(
                        &String::from_utf8_lossy(&bytes),
                        &self.settings.marker,
                        &self.settings.comment_token,
                    ),
                    Err(e) => Annotation::Unreadable(e.to_string()),
                };
                tracing::debug!(source_file = %source_file, ?annotation, "scanned fixture");
                Fixture {
                    path,
                    source_file,
                    annotation,
                }
            })
            .collect();
        Ok(fixtures)
    }

    fn no_fixtures(&self) -> ScanError {
        ScanError::NoFixtures {
            root: self.settings.root.clone(),
            extensions: self.settings.extensions.clone(),
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.settings.extensions.iter().any(|want| want == ext))
    }
}

/// `/`-separated path of `path` relative to `base`, both absolute
fn relative_path(path: &Path, base: &Path) -> String {
    let path: Vec<Component<'_>> = path.components().collect();
    let base: Vec<Component<'_>> = base.components().collect();
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();

    let mut parts = vec!["..".to_string(); base.len() - common];
    parts.extend(path[common..].iter().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    }));
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MARKER: &str = "// expected output";

    #[test]
    fn parse_finds_value_after_marker() {
        let text = "int main() {}\n// expected output\n// 7\n";
        assert_eq!(parse_annotation(text, MARKER, "//"), Annotation::Found("7".to_string()));
    }

    #[test]
    fn parse_marker_is_case_insensitive_and_trimmed() {
        let text = "   // EXPECTED Output  \n   //   hello world  \n";
        assert_eq!(
            parse_annotation(text, MARKER, "//"),
            Annotation::Found("hello world".to_string())
        );
    }

    #[test]
    fn parse_without_marker_is_missing() {
        assert_eq!(parse_annotation("int x;\n// 7\n", MARKER, "//"), Annotation::Missing);
    }

    #[test]
    fn parse_marker_on_last_line_is_dangling() {
        let text = "int x;\n// expected output";
        assert_eq!(parse_annotation(text, MARKER, "//"), Annotation::Dangling { line: 2 });
    }

    #[test]
    fn parse_empty_value_is_missing() {
        let text = "// expected output\n//   \nint x;\n";
        assert_eq!(parse_annotation(text, MARKER, "//"), Annotation::Missing);
    }

    #[test]
    fn parse_uses_first_marker() {
        let text = "// expected output\n// 1\n// expected output\n// 2\n";
        assert_eq!(parse_annotation(text, MARKER, "//"), Annotation::Found("1".to_string()));
    }

    #[test]
    fn parse_handles_crlf() {
        let text = "// expected output\r\n// 42\r\n";
        assert_eq!(parse_annotation(text, MARKER, "//"), Annotation::Found("42".to_string()));
    }

    #[test]
    fn discover_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("c");
        fs::create_dir_all(root.join("b_dir")).unwrap();
        fs::create_dir_all(root.join("a_dir")).unwrap();
        fs::write(root.join("b_dir/z.c"), "").unwrap();
        fs::write(root.join("a_dir/y.c"), "").unwrap();
        fs::write(root.join("a_dir/notes.txt"), "").unwrap();
        fs::write(root.join("top.c"), "").unwrap();

        let scanner = FixtureScanner::new(ScanSettings {
            root,
            test_root: dir.path().to_path_buf(),
            ..ScanSettings::default()
        });
        let relative: Vec<String> = scanner.discover().unwrap().into_iter().map(|(_, r)| r).collect();
        assert_eq!(relative, vec!["c/a_dir/y.c", "c/b_dir/z.c", "c/top.c"]);
    }

    #[test]
    fn discover_empty_tree_is_no_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FixtureScanner::new(ScanSettings {
            root: dir.path().to_path_buf(),
            test_root: dir.path().to_path_buf(),
            ..ScanSettings::default()
        });
        assert!(matches!(scanner.discover(), Err(ScanError::NoFixtures { .. })));
    }

    #[test]
    fn discover_missing_root_is_no_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FixtureScanner::new(ScanSettings {
            root: dir.path().join("does_not_exist"),
            test_root: dir.path().to_path_buf(),
            ..ScanSettings::default()
        });
        let err = scanner.discover().unwrap_err();
        assert!(matches!(err, ScanError::NoFixtures { .. }));
        assert!(err.halts_build());
    }

    #[test]
    fn discover_root_outside_test_root_is_dotted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        fs::create_dir_all(dir.path().join("extra")).unwrap();
        fs::write(dir.path().join("extra/x.c"), "").unwrap();

        let scanner = FixtureScanner::new(ScanSettings {
            root: dir.path().join("extra"),
            test_root: dir.path().join("tests"),
            ..ScanSettings::default()
        });
        let relative: Vec<String> = scanner.discover().unwrap().into_iter().map(|(_, r)| r).collect();
        assert_eq!(relative, vec!["../extra/x.c"]);
    }

    #[cfg(unix)]
    #[test]
    fn discover_skips_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let scanner = FixtureScanner::new(ScanSettings {
            root: dir.path().to_path_buf(),
            test_root: dir.path().to_path_buf(),
            ..ScanSettings::default()
        });
        let relative: Vec<String> = scanner.discover().unwrap().into_iter().map(|(_, r)| r).collect();
        assert_eq!(relative, vec!["a.c"]);
    }

    #[test]
    fn relative_path_walks_up_and_down() {
        assert_eq!(relative_path(Path::new("/w/tests/c/a.c"), Path::new("/w/tests")), "c/a.c");
        assert_eq!(relative_path(Path::new("/w/other/a.c"), Path::new("/w/tests")), "../other/a.c");
    }

    #[test]
    fn scan_reads_annotations() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("add.c"), "int main(){}\n// expected output\n// 7\n").unwrap();
        fs::write(dir.path().join("bare.c"), "int main(){}\n").unwrap();

        let scanner = FixtureScanner::new(ScanSettings {
            root: dir.path().to_path_buf(),
            test_root: dir.path().to_path_buf(),
            ..ScanSettings::default()
        });
        let fixtures = scanner.scan().unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].source_file, "add.c");
        assert_eq!(fixtures[0].expected_output(), "7");
        assert_eq!(fixtures[0].stem(), Some("add"));
        assert_eq!(fixtures[1].annotation, Annotation::Missing);
    }

    #[test]
    fn multiple_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::write(dir.path().join("b.cpp"), "").unwrap();
        let scanner = FixtureScanner::new(ScanSettings {
            root: dir.path().to_path_buf(),
            test_root: dir.path().to_path_buf(),
            extensions: vec!["c".to_string(), "cpp".to_string()],
            ..ScanSettings::default()
        });
        assert_eq!(scanner.discover().unwrap().len(), 2);
    }
}
