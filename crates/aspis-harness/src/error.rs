//! Harness-level errors
//!
//! Only conditions that should fail the process end up here. Halting
//! conditions of the build pass (no fixtures, no candidates, declined,
//! aborted) are [`crate::BuildStatus`] values instead.

use crate::config::ConfigError;
use aspis_matrix::{BuildError, ScanError, StoreError};

/// Errors from the `build` and `run` commands
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fixture discovery failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Candidate expansion failed
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Writing the store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Terminal IO failed
    #[error("console io error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failed
    #[error("failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}
