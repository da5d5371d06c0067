//! ASPIS execution pass
//!
//! Compiles and runs every case of a test matrix through the ASPIS
//! toolchain and checks each binary's output against the expected value
//! declared in its fixture.
//!
//! # Core Concepts
//!
//! - [`ExecutionEnvironment`]: where commands run, [`LocalEnvironment`] or
//!   [`ContainerEnvironment`]
//! - [`Pipeline`]: per-case compile → run → compare, failures isolated per case
//! - [`CaseOutcome`] / [`RunSummary`]: results, never persisted
//!
//! # Example
//!
//! ```rust,ignore
//! use aspis_exec::{LocalEnvironment, Pipeline, ToolchainSettings};
//! use std::sync::Arc;
//!
//! let env = LocalEnvironment::new(ToolchainSettings::default(), "./tests", "./build/test");
//! let summary = Pipeline::new(Arc::new(env)).with_jobs(4).run(&matrix).await;
//! assert!(summary.all_passed());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod environment;
mod error;
mod pipeline;
mod process;

// Re-exports
pub use environment::{
    binary_name, ContainerEnvironment, ContainerSettings, ExecutionEnvironment, LocalEnvironment,
    ToolchainSettings,
};
pub use error::EnvironmentError;
pub use pipeline::{CaseOutcome, CaseReport, CaseStage, FailureReason, Pipeline, RunSummary};
pub use process::{run_command, CommandOutput, CommandSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
