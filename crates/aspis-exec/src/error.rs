//! Error types for the execution pass
//!
//! Only failures to *launch* a command are errors. A command that runs and
//! exits non-zero is a normal [`crate::CommandOutput`] and becomes a case
//! outcome, never an error that could halt sibling cases.

use std::path::PathBuf;

/// Errors launching toolchain or fixture commands
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// The program could not be started
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process or reading its output failed
    #[error("failed waiting for '{program}': {source}")]
    Wait {
        /// Program that was launched
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Preparing the build directory failed
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// Path being prepared
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl EnvironmentError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the program itself was missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
