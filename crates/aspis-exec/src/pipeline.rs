//! Execution pipeline
//!
//! Drives every case of a matrix through compile, run and compare:
//!
//! ```text
//! Pending → Compiling → {CompileFailed | Compiled} → Running
//!         → {RunFailed | Ran} → {Mismatched | Passed}
//! ```
//!
//! Each case has its own build directory keyed by its test name, so cases
//! share no mutable state and may run concurrently. A failing case never
//! stops its siblings.

use crate::environment::ExecutionEnvironment;
use crate::process::CommandOutput;
use aspis_matrix::{TestCase, TestMatrix};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lifecycle of a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStage {
    /// Not started
    Pending,
    /// Compiler running
    Compiling,
    /// Compiler failed or could not be launched
    CompileFailed,
    /// Artifact produced
    Compiled,
    /// Artifact running
    Running,
    /// Artifact failed or could not be launched
    RunFailed,
    /// Artifact exited zero
    Ran,
    /// Output differs from the expected value
    Mismatched,
    /// Output matches the expected value
    Passed,
}

impl CaseStage {
    /// Whether the case has reached a final stage
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::CompileFailed | Self::RunFailed | Self::Mismatched | Self::Passed
        )
    }
}

/// Why a compile or run step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Process exited non-zero, or was killed by a signal (`code` is `None`)
    Exit {
        /// Exit code
        code: Option<i32>,
    },
    /// Invocation exceeded the time limit
    TimedOut {
        /// Measured time until the process was killed
        after_ms: u64,
    },
    /// Process could not be launched
    SpawnFailed,
}

impl FailureReason {
    fn from_output(output: &CommandOutput) -> Self {
        if output.timed_out {
            Self::TimedOut {
                after_ms: duration_ms(output.elapsed),
            }
        } else {
            Self::Exit {
                code: output.exit_code,
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit { code: Some(code) } => write!(f, "exit code {code}"),
            Self::Exit { code: None } => write!(f, "killed by signal"),
            Self::TimedOut { after_ms } => write!(f, "timed out after {after_ms} ms"),
            Self::SpawnFailed => write!(f, "failed to launch"),
        }
    }
}

/// Final result of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// Output matched
    Pass {
        /// Trimmed stdout
        actual: String,
    },
    /// Ran successfully but printed something else
    Mismatch {
        /// Trimmed stdout
        actual: String,
        /// Declared expected output
        expected: String,
    },
    /// The compiler failed
    CompileFailure {
        /// Failure detail
        reason: FailureReason,
        /// Compiler stderr, verbatim
        stderr: String,
    },
    /// The compiled artifact failed
    RunFailure {
        /// Failure detail
        reason: FailureReason,
        /// Artifact stderr, verbatim
        stderr: String,
    },
}

impl CaseOutcome {
    /// Stage this outcome corresponds to
    #[must_use]
    pub fn stage(&self) -> CaseStage {
        match self {
            Self::Pass { .. } => CaseStage::Passed,
            Self::Mismatch { .. } => CaseStage::Mismatched,
            Self::CompileFailure { .. } => CaseStage::CompileFailed,
            Self::RunFailure { .. } => CaseStage::RunFailed,
        }
    }

    /// Check if this is a pass
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}

/// Report for one executed case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    /// Case name
    pub test_name: String,
    /// Option string actually passed to the compiler
    pub options: String,
    /// Result
    #[serde(flatten)]
    pub outcome: CaseOutcome,
    /// Wall time for compile plus run
    pub elapsed_ms: u64,
}

impl CaseReport {
    /// Check if the case passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

/// Reports for a whole run, in matrix order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Per-case reports
    pub reports: Vec<CaseReport>,
}

impl RunSummary {
    /// Number of cases run
    #[must_use]
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// Number of passing cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    /// Number of failing cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Whether every case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(CaseReport::passed)
    }

    /// Failing reports only
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.reports.iter().filter(|r| !r.passed())
    }

    /// Pretty JSON rendering with totals
    ///
    /// # Errors
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({
            "total": self.total(),
            "passed": self.passed(),
            "failed": self.failed(),
            "reports": self.reports,
        }))
    }
}

/// Runs matrix cases through an [`ExecutionEnvironment`]
pub struct Pipeline {
    environment: Arc<dyn ExecutionEnvironment>,
    extra_options: String,
    jobs: usize,
}

impl Pipeline {
    /// Create a sequential pipeline
    pub fn new(environment: Arc<dyn ExecutionEnvironment>) -> Self {
        Self {
            environment,
            extra_options: String::new(),
            jobs: 1,
        }
    }

    /// Option suffix appended to every case's options
    #[must_use]
    pub fn with_extra_options(mut self, extra_options: impl Into<String>) -> Self {
        self.extra_options = extra_options.into();
        self
    }

    /// Maximum number of cases in flight (at least one)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run every case; reports come back in matrix order
    pub async fn run(&self, matrix: &TestMatrix) -> RunSummary {
        tracing::info!(
            cases = matrix.len(),
            jobs = self.jobs,
            environment = self.environment.name(),
            "starting run"
        );

        let reports = stream::iter(matrix.iter())
            .map(|case| self.run_case(case))
            .buffered(self.jobs)
            .collect::<Vec<_>>()
            .await;

        let summary = RunSummary { reports };
        tracing::info!(
            total = summary.total(),
            passed = summary.passed(),
            failed = summary.failed(),
            "run finished"
        );
        summary
    }

    /// Compile, run and check one case
    pub async fn run_case(&self, case: &TestCase) -> CaseReport {
        let started = Instant::now();
        let options = case.options_with_suffix(&self.extra_options);
        let outcome = self.execute(case, &options).await;

        if outcome.is_pass() {
            tracing::info!(test_name = %case.test_name, "PASS");
        } else {
            tracing::warn!(test_name = %case.test_name, stage = ?outcome.stage(), "FAIL");
        }

        CaseReport {
            test_name: case.test_name.clone(),
            options,
            outcome,
            elapsed_ms: duration_ms(started.elapsed()),
        }
    }

    async fn execute(&self, case: &TestCase, options: &str) -> CaseOutcome {
        let test_name = case.test_name.as_str();
        let build_dir = self.environment.resolve_build_dir(test_name);
        let env = &self.environment;

        advance(test_name, CaseStage::Pending, CaseStage::Compiling);
        let compiled = env
            .invoke_compiler(&case.source_file, &case.output_name(), options, &build_dir)
            .await;
        match compiled {
            Ok(output) if output.success() => {}
            Ok(output) => {
                return fail_compile(test_name, FailureReason::from_output(&output), output.stderr);
            }
            Err(e) => return fail_compile(test_name, FailureReason::SpawnFailed, e.to_string()),
        }
        advance(test_name, CaseStage::Compiling, CaseStage::Compiled);

        advance(test_name, CaseStage::Compiled, CaseStage::Running);
        let output = match env.invoke_binary(&build_dir, test_name).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                return fail_run(test_name, FailureReason::from_output(&output), output.stderr);
            }
            Err(e) => return fail_run(test_name, FailureReason::SpawnFailed, e.to_string()),
        };
        advance(test_name, CaseStage::Running, CaseStage::Ran);

        let actual = output.stdout.trim().to_string();
        let outcome = if actual == case.expected_output {
            CaseOutcome::Pass { actual }
        } else {
            CaseOutcome::Mismatch {
                actual,
                expected: case.expected_output.clone(),
            }
        };
        advance(test_name, CaseStage::Ran, outcome.stage());
        outcome
    }
}

fn advance(test_name: &str, from: CaseStage, to: CaseStage) {
    tracing::debug!(test_name, ?from, ?to, "case stage");
}

fn fail_compile(test_name: &str, reason: FailureReason, stderr: String) -> CaseOutcome {
    advance(test_name, CaseStage::Compiling, CaseStage::CompileFailed);
    CaseOutcome::CompileFailure { reason, stderr }
}

fn fail_run(test_name: &str, reason: FailureReason, stderr: String) -> CaseOutcome {
    advance(test_name, CaseStage::Running, CaseStage::RunFailed);
    CaseOutcome::RunFailure { reason, stderr }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MockExecutionEnvironment;
    use crate::error::EnvironmentError;
    use std::path::{Path, PathBuf};

    fn case(name: &str, expected: &str, options: &str) -> TestCase {
        TestCase::new(name, "c/add.c", expected, options)
    }

    fn mock_env() -> MockExecutionEnvironment {
        let mut env = MockExecutionEnvironment::new();
        env.expect_name().return_const("mock");
        env.expect_resolve_build_dir()
            .returning(|name| PathBuf::from("build").join(name));
        env
    }

    #[test]
    fn terminal_stages() {
        assert!(CaseStage::Passed.is_terminal());
        assert!(CaseStage::CompileFailed.is_terminal());
        assert!(!CaseStage::Compiled.is_terminal());
        assert!(!CaseStage::Pending.is_terminal());
    }

    #[tokio::test]
    async fn pass_compares_trimmed_stdout() {
        let mut env = mock_env();
        env.expect_invoke_compiler()
            .withf(|src, out, opts, dir| {
                src == "c/add.c"
                    && out == "add_v0.out"
                    && opts == "--eddi"
                    && dir == Path::new("build/add_v0")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(CommandOutput::exited(0, "", "")));
        env.expect_invoke_binary()
            .times(1)
            .returning(|_, _| Ok(CommandOutput::exited(0, "7\n", "")));

        let pipeline = Pipeline::new(Arc::new(env));
        let report = pipeline.run_case(&case("add_v0", "7", "--eddi")).await;

        assert_eq!(report.outcome, CaseOutcome::Pass { actual: "7".to_string() });
        assert!(report.passed());
    }

    #[tokio::test]
    async fn compile_failure_skips_binary() {
        let mut env = mock_env();
        env.expect_invoke_compiler()
            .returning(|_, _, _, _| Ok(CommandOutput::exited(1, "", "bad flag\n")));
        env.expect_invoke_binary().never();

        let report = Pipeline::new(Arc::new(env))
            .run_case(&case("add_v0", "7", "--bogus"))
            .await;

        assert_eq!(
            report.outcome,
            CaseOutcome::CompileFailure {
                reason: FailureReason::Exit { code: Some(1) },
                stderr: "bad flag\n".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn run_failure_keeps_stderr() {
        let mut env = mock_env();
        env.expect_invoke_compiler()
            .returning(|_, _, _, _| Ok(CommandOutput::exited(0, "", "")));
        env.expect_invoke_binary()
            .returning(|_, _| Ok(CommandOutput::exited(139, "", "segfault")));

        let report = Pipeline::new(Arc::new(env)).run_case(&case("a_v0", "1", "")).await;

        assert_eq!(report.outcome.stage(), CaseStage::RunFailed);
        assert!(matches!(
            report.outcome,
            CaseOutcome::RunFailure { reason: FailureReason::Exit { code: Some(139) }, ref stderr } if stderr == "segfault"
        ));
    }

    #[tokio::test]
    async fn mismatch_reports_both_values() {
        let mut env = mock_env();
        env.expect_invoke_compiler()
            .returning(|_, _, _, _| Ok(CommandOutput::exited(0, "", "")));
        env.expect_invoke_binary()
            .returning(|_, _| Ok(CommandOutput::exited(0, "  8 \n", "")));

        let report = Pipeline::new(Arc::new(env)).run_case(&case("add_v0", "7", "")).await;

        assert_eq!(
            report.outcome,
            CaseOutcome::Mismatch {
                actual: "8".to_string(),
                expected: "7".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn timeout_has_distinct_reason() {
        let mut env = mock_env();
        env.expect_invoke_compiler()
            .returning(|_, _, _, _| Ok(CommandOutput::timed_out(Duration::from_millis(250))));

        let report = Pipeline::new(Arc::new(env)).run_case(&case("a_v0", "1", "")).await;

        assert!(matches!(
            report.outcome,
            CaseOutcome::CompileFailure { reason: FailureReason::TimedOut { after_ms: 250 }, .. }
        ));
        assert_eq!(
            FailureReason::TimedOut { after_ms: 250 }.to_string(),
            "timed out after 250 ms"
        );
    }

    #[tokio::test]
    async fn spawn_error_becomes_case_failure() {
        let mut env = mock_env();
        env.expect_invoke_compiler().returning(|_, _, _, _| {
            Err(EnvironmentError::Spawn {
                program: "aspis.sh".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        });

        let report = Pipeline::new(Arc::new(env)).run_case(&case("a_v0", "1", "")).await;

        match report.outcome {
            CaseOutcome::CompileFailure { reason, stderr } => {
                assert_eq!(reason, FailureReason::SpawnFailed);
                assert!(stderr.contains("aspis.sh"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn extra_options_are_appended() {
        let mut env = mock_env();
        env.expect_invoke_compiler()
            .withf(|_, _, opts, _| opts == "--eddi --debug")
            .returning(|_, _, _, _| Ok(CommandOutput::exited(0, "", "")));
        env.expect_invoke_binary()
            .returning(|_, _| Ok(CommandOutput::exited(0, "7", "")));

        let report = Pipeline::new(Arc::new(env))
            .with_extra_options("--debug")
            .run_case(&case("add_v0", "7", "--eddi"))
            .await;

        assert_eq!(report.options, "--eddi --debug");
        assert!(report.passed());
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings_and_order_is_kept() {
        let mut env = mock_env();
        env.expect_invoke_compiler().returning(|src, _, _, _| {
            if src == "c/broken.c" {
                Ok(CommandOutput::exited(1, "", "error"))
            } else {
                Ok(CommandOutput::exited(0, "", ""))
            }
        });
        env.expect_invoke_binary()
            .times(2)
            .returning(|_, _| Ok(CommandOutput::exited(0, "7\n", "")));

        let matrix: TestMatrix = vec![
            TestCase::new("broken_v0", "c/broken.c", "7", ""),
            TestCase::new("add_v0", "c/add.c", "7", ""),
            TestCase::new("add_v1", "c/add.c", "7", ""),
        ]
        .into_iter()
        .collect();

        let summary = Pipeline::new(Arc::new(env)).with_jobs(3).run(&matrix).await;

        let names: Vec<_> = summary.reports.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names, vec!["broken_v0", "add_v0", "add_v1"]);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.failures().next().map(|r| r.test_name.as_str()), Some("broken_v0"));
    }

    #[test]
    fn report_serializes_with_outcome_tag() {
        let report = CaseReport {
            test_name: "add_v0".to_string(),
            options: "--eddi".to_string(),
            outcome: CaseOutcome::CompileFailure {
                reason: FailureReason::TimedOut { after_ms: 10 },
                stderr: String::new(),
            },
            elapsed_ms: 10,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "compile_failure");
        assert_eq!(json["reason"]["kind"], "timed_out");
        assert_eq!(json["test_name"], "add_v0");
    }

    #[test]
    fn summary_json_has_totals() {
        let summary = RunSummary {
            reports: vec![CaseReport {
                test_name: "add_v0".to_string(),
                options: String::new(),
                outcome: CaseOutcome::Pass { actual: "7".to_string() },
                elapsed_ms: 1,
            }],
        };
        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["passed"], 1);
        assert_eq!(json["failed"], 0);
        assert_eq!(json["reports"][0]["outcome"], "pass");
    }

    #[test]
    fn jobs_is_at_least_one() {
        let env = mock_env();
        let pipeline = Pipeline::new(Arc::new(env)).with_jobs(0);
        assert_eq!(pipeline.jobs, 1);
    }
}
