//! The run pass: aggregate stores, pick an environment, execute, report

use crate::config::HarnessConfig;
use crate::console::write_summary;
use crate::error::HarnessError;
use aspis_exec::{ContainerEnvironment, ExecutionEnvironment, LocalEnvironment, Pipeline, RunSummary};
use aspis_matrix::{load_aggregate, MatrixStore, TestMatrix};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Run-pass options after CLI overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Stores to aggregate, later ones override earlier ones
    pub stores: Vec<PathBuf>,
    /// Compile through the container backend
    pub container: bool,
    /// Appended to every case's options
    pub extra_options: String,
    /// Cases in flight
    pub jobs: usize,
    /// Per-invocation limit
    pub timeout: Option<Duration>,
    /// Only run cases whose name contains this
    pub filter: Option<String>,
    /// Emit the summary as JSON
    pub json: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stores: vec![PathBuf::from("docker_test_config.json")],
            container: false,
            extra_options: String::new(),
            jobs: 1,
            timeout: None,
            filter: None,
            json: false,
        }
    }
}

/// Keep only cases whose name contains `filter`
#[must_use]
pub fn select_cases(matrix: TestMatrix, filter: Option<&str>) -> TestMatrix {
    match filter {
        Some(needle) => matrix
            .into_iter()
            .filter(|case| case.test_name.contains(needle))
            .collect(),
        None => matrix,
    }
}

/// Environment chosen by the `--use-container` flag
#[must_use]
pub fn environment(config: &HarnessConfig, options: &RunOptions) -> Arc<dyn ExecutionEnvironment> {
    if options.container {
        Arc::new(
            ContainerEnvironment::new(config.toolchain.clone(), config.container.clone())
                .with_timeout(options.timeout),
        )
    } else {
        Arc::new(
            LocalEnvironment::new(
                config.toolchain.clone(),
                config.fixtures.test_root.clone(),
                config.execution.build_root.clone(),
            )
            .with_timeout(options.timeout),
        )
    }
}

/// Load, execute and report.
///
/// # Errors
/// Only writing the report can fail; case failures are in the summary.
pub async fn run_matrix<W: Write>(
    config: &HarnessConfig,
    options: &RunOptions,
    out: &mut W,
) -> Result<RunSummary, HarnessError> {
    let stores: Vec<_> = options.stores.iter().map(MatrixStore::new).collect();
    let matrix = select_cases(load_aggregate(&stores), options.filter.as_deref());
    if matrix.is_empty() {
        tracing::warn!(stores = ?options.stores, filter = ?options.filter, "no test cases to run");
    }

    let summary = Pipeline::new(environment(config, options))
        .with_extra_options(options.extra_options.clone())
        .with_jobs(options.jobs)
        .run(&matrix)
        .await;

    if options.json {
        writeln!(out, "{}", summary.to_json()?)?;
    } else {
        write_summary(out, &summary)?;
    }
    Ok(summary)
}
