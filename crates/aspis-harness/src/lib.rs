//! ASPIS test harness
//!
//! Ties the matrix build pass and the execution pass together behind one
//! command line.
//!
//! # Core Concepts
//!
//! - [`HarnessConfig`]: TOML configuration, every field defaulted
//! - [`run_build`]: discover fixtures, confirm, expand, merge into the store
//! - [`run_matrix`]: aggregate stores and execute them locally or in a container
//! - [`Console`]: prompts and reports over any reader/writer pair

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod logging;

mod build;
mod config;
mod console;
mod error;
mod run;

// Re-exports
pub use build::{run_build, BuildOptions, BuildStatus};
pub use config::{ConfigError, ExecutionSettings, HarnessConfig, DEFAULT_CONFIG_FILE};
pub use console::{report_line, write_summary, Console};
pub use error::HarnessError;
pub use run::{environment, run_matrix, select_cases, RunOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
