//! ASPIS test matrix
//!
//! The build pass of the test harness: turn annotated source fixtures into
//! a persisted, keyed test matrix.
//!
//! # Core Concepts
//!
//! - [`FixtureScanner`]: walks a fixture tree and reads expected-output annotations
//! - [`MatrixBuilder`]: expands fixtures against [`OptionProfile`]s into candidates
//! - [`merge`]: reconciles candidates with the stored matrix via a [`DecisionProvider`]
//! - [`MatrixStore`]: JSON persistence, forgiving on read, full replace on write
//! - [`load_aggregate`]: several stores read as one matrix for the run pass
//!
//! # Example
//!
//! ```rust,ignore
//! use aspis_matrix::{default_profiles, merge, FixtureScanner, MatrixBuilder, MatrixStore, ScanSettings};
//!
//! let fixtures = FixtureScanner::new(ScanSettings::default()).scan()?;
//! let outcome = MatrixBuilder::new(default_profiles())?.build(&fixtures)?;
//!
//! let store = MatrixStore::new("docker_test_config.json");
//! let report = merge(store.load(), &outcome.candidates, &mut prompt)?;
//! store.save(&report.matrix)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod builder;
mod case;
mod error;
mod fixture;
mod merge;
mod profile;
mod store;

// Re-exports
pub use builder::{BuildOutcome, MatrixBuilder, SkipReason, SkippedFixture};
pub use case::{TestCase, TestMatrix};
pub use error::{BuildError, MergeError, ScanError, StoreError};
pub use fixture::{parse_annotation, Annotation, Fixture, FixtureScanner, ScanSettings};
pub use merge::{
    merge, Conflict, DecisionProvider, FixedDecision, MergeDecision, MergeReport,
    ParseDecisionError, ScriptedDecisions,
};
pub use profile::{default_profiles, OptionProfile};
pub use store::{load_aggregate, MatrixStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
