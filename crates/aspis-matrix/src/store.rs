//! Durable matrix store
//!
//! The store is a pretty-printed JSON document `{"tests": [...]}`. Reads are
//! forgiving: a missing or corrupt file is an empty matrix. Writes replace the
//! whole file through a temp file in the same directory, so an interrupted
//! save leaves the previous store in place.

use crate::case::{TestCase, TestMatrix};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    tests: Vec<TestCase>,
}

/// Matrix persisted at one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixStore {
    path: PathBuf,
}

impl MatrixStore {
    /// Store at `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the matrix, treating absence and corruption as empty.
    ///
    /// Never fails; problems are logged as warnings.
    #[must_use]
    pub fn load(&self) -> TestMatrix {
        match self.try_load() {
            Ok(matrix) => matrix,
            Err(e) => {
                tracing::warn!(store = %self.path.display(), error = %e, "ignoring unreadable store contents");
                TestMatrix::new()
            }
        }
    }

    /// Load the matrix, reporting corruption.
    ///
    /// A missing file is an empty matrix, not an error. When a name appears
    /// more than once the last record wins.
    ///
    /// # Errors
    /// - `StoreError::Io` if the file exists but cannot be read
    /// - `StoreError::Corrupt` if it is not a valid matrix document
    pub fn try_load(&self) -> Result<TestMatrix, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(store = %self.path.display(), "store not found, starting empty");
                return Ok(TestMatrix::new());
            }
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };

        let document: StoreDocument =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let (matrix, duplicates) = TestMatrix::from_cases_lossy(document.tests);
        if !duplicates.is_empty() {
            tracing::warn!(store = %self.path.display(), ?duplicates, "duplicate test names in store, last record kept");
        }
        Ok(matrix)
    }

    /// Replace the stored matrix.
    ///
    /// # Errors
    /// Fails if the directory cannot be created, the temp file cannot be
    /// written, or the rename over the store fails.
    pub fn save(&self, matrix: &TestMatrix) -> Result<(), StoreError> {
        let document = StoreDocument {
            tests: matrix.iter().cloned().collect(),
        };
        let mut json = serde_json::to_string_pretty(&document).map_err(StoreError::Serialize)?;
        json.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io_error(&dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StoreError::io_error(&dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io_error(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        tracing::info!(store = %self.path.display(), tests = matrix.len(), "saved test matrix");
        Ok(())
    }
}

/// Load several stores into one matrix.
///
/// Stores are read in order with [`MatrixStore::load`]. A name present in
/// more than one store takes the later store's record and is logged.
#[must_use]
pub fn load_aggregate(stores: &[MatrixStore]) -> TestMatrix {
    let mut aggregate = TestMatrix::new();
    for store in stores {
        let matrix = store.load();
        tracing::debug!(store = %store.path().display(), tests = matrix.len(), "loaded store");
        for case in matrix {
            let test_name = case.test_name.clone();
            if aggregate.insert(case).is_some() {
                tracing::warn!(store = %store.path().display(), %test_name, "test defined in more than one store, later store wins");
            }
        }
    }
    aggregate
}
