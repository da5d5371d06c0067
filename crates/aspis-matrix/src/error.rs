//! Error types for the matrix build pass
//!
//! Provides error handling for:
//! - Fixture discovery (scan → fixtures)
//! - Candidate expansion (fixtures → candidate matrix)
//! - Merge reconciliation (user abort)
//! - Store persistence (matrix → file)
//!
//! Per-fixture problems (missing annotation, unreadable file) are not errors:
//! they are carried as [`crate::SkipReason`] values so one bad fixture never
//! halts its siblings.

use crate::builder::SkippedFixture;
use std::path::PathBuf;

/// Errors during fixture discovery
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The fixture root is missing or holds no file with a configured extension
    #[error("no fixtures with extensions {extensions:?} found under {}", root.display())]
    NoFixtures {
        /// Fixture root that was walked
        root: PathBuf,
        /// Extensions that were searched for
        extensions: Vec<String>,
    },

    /// IO error resolving the fixture or test root
    #[error("io error walking {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ends the build pass without failing the process
    #[inline]
    #[must_use]
    pub fn halts_build(&self) -> bool {
        matches!(self, Self::NoFixtures { .. })
    }
}

/// Errors during candidate expansion
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The profile list is empty
    #[error("no option profiles configured")]
    NoProfiles,

    /// Every fixture was skipped
    #[error("no valid test cases generated ({} fixtures skipped); ensure expected output comments exist", skipped.len())]
    NoCandidates {
        /// Fixtures that were skipped, with reasons
        skipped: Vec<SkippedFixture>,
    },
}

impl BuildError {
    /// Whether this error ends the build pass without failing the process
    #[inline]
    #[must_use]
    pub fn halts_build(&self) -> bool {
        matches!(self, Self::NoCandidates { .. })
    }
}

/// Errors during merge reconciliation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The decision provider chose to abort the whole merge
    #[error("merge aborted at conflict on '{test_name}'")]
    Aborted {
        /// Conflicting test name at which the abort was chosen
        test_name: String,
    },
}

impl MergeError {
    /// Check if the merge was stopped by the user
    #[inline]
    #[must_use]
    pub fn is_user_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Errors reading or writing the matrix store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error on the store path
    #[error("io error on store {}: {source}", path.display())]
    Io {
        /// Store path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Store content is not a valid matrix document
    #[error("store {} is corrupt: {source}", path.display())]
    Corrupt {
        /// Store path
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Matrix could not be serialized
    #[error("failed to serialize matrix: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Temp file could not be renamed over the store
    #[error("failed to replace store {}: {source}", path.display())]
    Persist {
        /// Store path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_display() {
        let err = ScanError::NoFixtures {
            root: PathBuf::from("tests/c"),
            extensions: vec!["c".to_string()],
        };
        assert!(err.to_string().contains("tests/c"));
        assert!(err.halts_build());
    }

    #[test]
    fn io_error_does_not_halt_quietly() {
        let err = ScanError::io_error(
            "tests/c",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.halts_build());
    }

    #[test]
    fn merge_error_is_user_abort() {
        let err = MergeError::Aborted {
            test_name: "add_v0".to_string(),
        };
        assert!(err.is_user_abort());
        assert!(err.to_string().contains("add_v0"));
    }

    #[test]
    fn build_error_halts() {
        assert!(BuildError::NoCandidates { skipped: vec![] }.halts_build());
        assert!(!BuildError::NoProfiles.halts_build());
    }
}
