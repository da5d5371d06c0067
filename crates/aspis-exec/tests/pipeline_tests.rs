//! Pipeline runs against a stand-in compiler driver
//!
//! Fixtures are shell scripts carrying the usual annotation after `exit`;
//! the fake driver copies them into the build directory as the "binary".

#![cfg(unix)]

use aspis_exec::{
    CaseOutcome, ContainerEnvironment, ContainerSettings, FailureReason, LocalEnvironment,
    Pipeline, ToolchainSettings,
};
use aspis_matrix::{default_profiles, FixtureScanner, MatrixBuilder, TestCase, TestMatrix};
use aspis_test_utils::FixtureTree;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn local_env(tree: &FixtureTree) -> LocalEnvironment {
    let toolchain = ToolchainSettings {
        aspis_script: tree.fake_compiler(),
        llvm_bin: Some("/opt/llvm/bin".into()),
        extra_args: vec!["--verbose".to_string()],
    };
    LocalEnvironment::new(toolchain, tree.test_root(), tree.path().join("build/test"))
}

fn matrix(cases: Vec<TestCase>) -> TestMatrix {
    cases.into_iter().collect()
}

#[tokio::test]
async fn binary_output_matches_expected() {
    let tree = FixtureTree::new();
    tree.script("add.c", "7", 0, "7");
    let pipeline = Pipeline::new(Arc::new(local_env(&tree)));

    let report = pipeline
        .run_case(&TestCase::new("add_v0", "c/add.c", "7", "--eddi --cfcss"))
        .await;

    assert_eq!(report.outcome, CaseOutcome::Pass { actual: "7".to_string() });
    assert!(tree.path().join("build/test/add_v0/add_v0.out").exists());
}

#[tokio::test]
async fn compile_failure_does_not_stop_next_case() {
    let tree = FixtureTree::new();
    tree.script("add.c", "7", 0, "7");
    let pipeline = Pipeline::new(Arc::new(local_env(&tree)));

    let summary = pipeline
        .run(&matrix(vec![
            TestCase::new("add_v0", "c/add.c", "7", "--fail"),
            TestCase::new("add_v1", "c/add.c", "7", "--eddi"),
        ]))
        .await;

    assert_eq!(summary.total(), 2);
    match &summary.reports[0].outcome {
        CaseOutcome::CompileFailure { reason, stderr } => {
            assert_eq!(*reason, FailureReason::Exit { code: Some(1) });
            assert!(stderr.contains("instrumentation pass crashed"));
        }
        other => panic!("expected compile failure, got {other:?}"),
    }
    assert!(summary.reports[1].passed());
    assert_eq!(summary.failed(), 1);
}

#[tokio::test]
async fn wrong_output_is_mismatch() {
    let tree = FixtureTree::new();
    tree.script("off_by_one.c", "8", 0, "7");
    let pipeline = Pipeline::new(Arc::new(local_env(&tree)));

    let report = pipeline
        .run_case(&TestCase::new("off_by_one_v0", "c/off_by_one.c", "7", ""))
        .await;

    assert_eq!(
        report.outcome,
        CaseOutcome::Mismatch {
            actual: "8".to_string(),
            expected: "7".to_string(),
        }
    );
}

#[tokio::test]
async fn nonzero_exit_is_run_failure() {
    let tree = FixtureTree::new();
    tree.script("crash.c", "partial", 3, "partial");
    let pipeline = Pipeline::new(Arc::new(local_env(&tree)));

    let report = pipeline
        .run_case(&TestCase::new("crash_v0", "c/crash.c", "partial", ""))
        .await;

    assert!(matches!(
        report.outcome,
        CaseOutcome::RunFailure { reason: FailureReason::Exit { code: Some(3) }, .. }
    ));
}

#[tokio::test]
async fn hanging_compiler_times_out() {
    let tree = FixtureTree::new();
    tree.script("add.c", "7", 0, "7");
    let env = local_env(&tree).with_timeout(Some(Duration::from_millis(200)));
    let pipeline = Pipeline::new(Arc::new(env));

    let report = pipeline
        .run_case(&TestCase::new("add_v0", "c/add.c", "7", "--hang"))
        .await;

    assert!(matches!(
        report.outcome,
        CaseOutcome::CompileFailure { reason: FailureReason::TimedOut { .. }, .. }
    ));
}

#[tokio::test]
async fn built_matrix_runs_in_order_with_jobs() {
    let tree = FixtureTree::new();
    tree.script("add.c", "7", 0, "7");
    tree.script("nested/mul.c", "12", 0, "12");
    tree.add("notes.c", "int main(void) { return 0; }\n");

    let fixtures = FixtureScanner::new(tree.settings()).scan().unwrap();
    let outcome = MatrixBuilder::new(default_profiles()).unwrap().build(&fixtures).unwrap();
    let pipeline = Pipeline::new(Arc::new(local_env(&tree)))
        .with_extra_options("--debug")
        .with_jobs(4);

    let summary = pipeline.run(&outcome.candidates).await;

    let names: Vec<_> = summary.reports.iter().map(|r| r.test_name.as_str()).collect();
    let expected: Vec<_> = outcome.candidates.names().collect();
    assert_eq!(names, expected);
    assert_eq!(summary.total(), 8);
    assert!(summary.all_passed(), "{:#?}", summary.failures().collect::<Vec<_>>());
    assert!(summary.reports.iter().all(|r| r.options.ends_with(" --debug")));
}

/// Stand-in for `docker`: drops `compose -f <file> run --rm <service>` and
/// hands the remaining arguments to the fake driver.
fn fake_docker(tree: &FixtureTree) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let aspis = tree.fake_compiler();
    let path = tree.path().join("docker");
    std::fs::write(&path, format!("#!/bin/sh\nshift 6\nexec '{}' \"$@\"\n", aspis.display())).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn container_paths_map_through_shared_volume() {
    let tree = FixtureTree::new();
    tree.script("add.c", "7", 0, "7");

    // The "container" sees the test tree through a symlinked volume path.
    let volume = tree.path().join("volume");
    std::os::unix::fs::symlink(tree.test_root(), &volume).unwrap();
    let compose_dir = tree.path().join("docker-dir");
    std::fs::create_dir_all(&compose_dir).unwrap();

    let settings = ContainerSettings {
        program: fake_docker(&tree).display().to_string(),
        compose_file: compose_dir.join("docker-compose.yml"),
        shared_volume: volume,
        local_mount: tree.test_root(),
        ..ContainerSettings::default()
    };
    let env = ContainerEnvironment::new(ToolchainSettings::default(), settings);
    let pipeline = Pipeline::new(Arc::new(env));

    let report = pipeline
        .run_case(&TestCase::new("add_v0", "c/add.c", "7", "--eddi --cfcss"))
        .await;

    assert_eq!(report.outcome, CaseOutcome::Pass { actual: "7".to_string() });
    assert!(tree.test_root().join("build/add_v0/add_v0.out").exists());
}
