//! Command-line definition and flag-over-config resolution

use crate::build::BuildOptions;
use crate::config::HarnessConfig;
use crate::logging::LogFormat;
use crate::run::RunOptions;
use aspis_matrix::MergeDecision;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Default store path for both passes
pub const DEFAULT_STORE: &str = "docker_test_config.json";

/// Build the clap command tree
#[must_use]
pub fn command() -> Command {
    Command::new("aspis-harness")
        .version(crate::VERSION)
        .about("Build, merge and run ASPIS test matrices")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: aspis-harness.toml if present)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging unless RUST_LOG is set"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("build")
                .about("Generate test cases from annotated fixtures and merge them into a store")
                .arg(
                    Arg::new("dir")
                        .short('d')
                        .long("dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Fixture directory to search (default: ./tests/c)"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value(DEFAULT_STORE)
                        .value_parser(value_parser!(PathBuf))
                        .help("Store file to create or update"),
                )
                .arg(
                    Arg::new("preview")
                        .long("preview")
                        .value_parser(value_parser!(usize))
                        .help("Number of candidates to preview"),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Answer yes to the settings and save confirmations"),
                )
                .arg(
                    Arg::new("on-conflict")
                        .long("on-conflict")
                        .value_parser(["skip", "overwrite", "overwrite-all", "abort", "keep"])
                        .help("Resolve every conflict this way instead of prompting"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Compile and run every stored test case")
                .arg(
                    Arg::new("store")
                        .short('s')
                        .long("store")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(PathBuf))
                        .help("Store to run; repeat to aggregate (default: docker_test_config.json)"),
                )
                .arg(
                    Arg::new("use-container")
                        .long("use-container")
                        .action(ArgAction::SetTrue)
                        .help("Compile through docker compose instead of the local aspis.sh"),
                )
                .arg(
                    Arg::new("extra-options")
                        .long("extra-options")
                        .default_value("")
                        .allow_hyphen_values(true)
                        .help("Options appended to every test case"),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .value_parser(value_parser!(usize))
                        .help("Cases to run concurrently"),
                )
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .value_parser(value_parser!(u64))
                        .help("Limit per compile or run, 0 for none"),
                )
                .arg(
                    Arg::new("filter")
                        .long("filter")
                        .help("Only run tests whose name contains this text"),
                )
                .arg(
                    Arg::new("llvm-bin")
                        .long("llvm-bin")
                        .value_parser(value_parser!(PathBuf))
                        .help("LLVM bin directory for local compilation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the summary as JSON"),
                ),
        )
}

/// Config file from `--config`, given before or after the subcommand
#[must_use]
pub fn config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches
        .get_one::<PathBuf>("config")
        .or_else(|| matches.subcommand().and_then(|(_, sub)| sub.get_one::<PathBuf>("config")))
        .cloned()
}

/// Logging settings from global flags
#[must_use]
pub fn log_settings(matches: &ArgMatches) -> (bool, LogFormat) {
    let format = if matches.get_flag("log-json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    (matches.get_flag("verbose"), format)
}

/// Apply `build` flags to the config and derive build options
#[must_use]
pub fn build_options(config: &mut HarnessConfig, args: &ArgMatches) -> BuildOptions {
    if let Some(dir) = args.get_one::<PathBuf>("dir") {
        config.fixtures.root.clone_from(dir);
    }
    BuildOptions {
        store: args
            .get_one::<PathBuf>("output")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE)),
        preview: args
            .get_one::<usize>("preview")
            .copied()
            .unwrap_or(config.execution.preview),
        on_conflict: args
            .get_one::<String>("on-conflict")
            .and_then(|choice| choice.parse::<MergeDecision>().ok()),
    }
}

/// Whether `--yes` was given
#[must_use]
pub fn assume_yes(args: &ArgMatches) -> bool {
    args.get_flag("yes")
}

/// Apply `run` flags to the config and derive run options
#[must_use]
pub fn run_options(config: &mut HarnessConfig, args: &ArgMatches) -> RunOptions {
    if let Some(llvm_bin) = args.get_one::<PathBuf>("llvm-bin") {
        config.toolchain.llvm_bin = Some(llvm_bin.clone());
    }
    if let Some(secs) = args.get_one::<u64>("timeout-secs") {
        config.execution.timeout_secs = *secs;
    }
    if let Some(jobs) = args.get_one::<usize>("jobs") {
        config.execution.jobs = *jobs;
    }

    let stores: Vec<PathBuf> = args
        .get_many::<PathBuf>("store")
        .map(|values| values.cloned().collect())
        .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_STORE)]);

    RunOptions {
        stores,
        container: args.get_flag("use-container"),
        extra_options: args
            .get_one::<String>("extra-options")
            .cloned()
            .unwrap_or_default(),
        jobs: config.execution.jobs,
        timeout: config.execution.timeout(),
        filter: args.get_one::<String>("filter").cloned(),
        json: args.get_flag("json"),
    }
}
