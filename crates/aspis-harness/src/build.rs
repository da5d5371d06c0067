//! The build pass: scan → confirm → expand → preview → confirm → merge → save

use crate::config::HarnessConfig;
use crate::console::Console;
use crate::error::HarnessError;
use aspis_matrix::{
    merge, BuildError, FixedDecision, FixtureScanner, MatrixBuilder, MatrixStore, MergeDecision,
    MergeError,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Build-pass options after CLI overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Store to merge into
    pub store: PathBuf,
    /// Candidates shown before confirmation
    pub preview: usize,
    /// Fixed answer for every conflict instead of prompting
    pub on_conflict: Option<MergeDecision>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            store: PathBuf::from("docker_test_config.json"),
            preview: 3,
            on_conflict: None,
        }
    }
}

/// How a build pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// The merged matrix was written
    Saved {
        /// New test names
        added: usize,
        /// Replaced test cases
        updated: usize,
        /// Cases in the saved store
        total: usize,
    },
    /// Nothing to scan
    NoFixtures,
    /// No fixture carried an expected output
    NoCandidates,
    /// The user answered no to a confirmation
    Declined,
    /// The user aborted at a conflict
    Aborted {
        /// Conflict being resolved
        test_name: String,
    },
}

impl BuildStatus {
    /// Whether the store was written
    #[must_use]
    pub fn saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Run the build pass.
///
/// The store is only written after every confirmation is given and the
/// merge completes; every other outcome leaves it byte-for-byte unchanged.
///
/// # Errors
/// Scan and IO failures other than "no fixtures", and store write failures.
pub fn run_build<R: BufRead, W: Write>(
    config: &HarnessConfig,
    options: &BuildOptions,
    console: &mut Console<R, W>,
) -> Result<BuildStatus, HarnessError> {
    writeln!(console.out(), "\n=== ASPIS Test Configuration Generator ===")?;

    let scanner = FixtureScanner::new(config.fixtures.clone());
    let fixtures = match scanner.scan() {
        Ok(fixtures) => fixtures,
        Err(e) if e.halts_build() => {
            tracing::warn!(error = %e, "no fixtures found");
            writeln!(console.out(), "\nNo test files found in {}", config.fixtures.root.display())?;
            return Ok(BuildStatus::NoFixtures);
        }
        Err(e) => return Err(e.into()),
    };

    writeln!(console.out(), "\nSettings:")?;
    writeln!(console.out(), "  fixture root: {}", config.fixtures.root.display())?;
    writeln!(console.out(), "  store:        {}", options.store.display())?;
    writeln!(console.out(), "  profiles:     {}", config.profiles.len())?;
    writeln!(console.out(), "  fixtures found ({}):", fixtures.len())?;
    for fixture in &fixtures {
        writeln!(console.out(), "    - {}", fixture.source_file)?;
    }
    if !console.confirm("Proceed with these settings?")? {
        writeln!(console.out(), "Aborted.")?;
        return Ok(BuildStatus::Declined);
    }

    let builder = MatrixBuilder::new(config.profiles.clone())?;
    let outcome = match builder.build(&fixtures) {
        Ok(outcome) => outcome,
        Err(BuildError::NoCandidates { skipped }) => {
            writeln!(
                console.out(),
                "\nNo valid tests generated. Ensure expected output comments exist."
            )?;
            for skip in &skipped {
                writeln!(console.out(), "  skipped {}: {}", skip.source_file, skip.reason)?;
            }
            return Ok(BuildStatus::NoCandidates);
        }
        Err(e) => return Err(e.into()),
    };
    for skip in &outcome.skipped {
        writeln!(console.out(), "  skipped {}: {}", skip.source_file, skip.reason)?;
    }

    console.preview(&outcome.candidates, options.preview)?;
    if !console.confirm("Continue and save this config?")? {
        writeln!(console.out(), "Aborted.")?;
        return Ok(BuildStatus::Declined);
    }

    let store = MatrixStore::new(&options.store);
    let existing = store.load();
    let merged = match options.on_conflict {
        Some(decision) => merge(existing, &outcome.candidates, &mut FixedDecision(decision)),
        None => merge(existing, &outcome.candidates, console),
    };
    let report = match merged {
        Ok(report) => report,
        Err(MergeError::Aborted { test_name }) => {
            tracing::info!(%test_name, store = %options.store.display(), "merge aborted, store unchanged");
            writeln!(console.out(), "\nAborted at '{test_name}'. Store left unchanged.")?;
            return Ok(BuildStatus::Aborted { test_name });
        }
    };

    store.save(&report.matrix)?;
    let total = report.matrix.len();
    writeln!(
        console.out(),
        "\nSaved {total} total tests to '{}'",
        options.store.display()
    )?;
    writeln!(
        console.out(),
        "Added: {}, Updated: {}, Total: {total}",
        report.added, report.updated
    )?;
    if report.skipped + report.dropped + report.unchanged > 0 {
        writeln!(
            console.out(),
            "Kept existing: {}, Dropped: {}, Unchanged: {}",
            report.skipped, report.dropped, report.unchanged
        )?;
    }

    Ok(BuildStatus::Saved {
        added: report.added,
        updated: report.updated,
        total,
    })
}
