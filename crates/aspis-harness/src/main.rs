//! `aspis-harness` binary: `build` and `run` subcommands

use anyhow::Context;
use aspis_harness::{cli, logging, run_build, run_matrix, Console, HarnessConfig};
use std::io::{self, Write};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let matches = cli::command().get_matches();

    let (verbose, format) = cli::log_settings(&matches);
    logging::init(verbose, format);

    let config_path = cli::config_path(&matches);
    let mut config = HarnessConfig::load(config_path.as_deref()).context("loading configuration")?;

    match matches.subcommand() {
        Some(("build", args)) => {
            let options = cli::build_options(&mut config, args);
            let stdin = io::stdin();
            let mut console = Console::new(stdin.lock(), io::stdout()).assume_yes(cli::assume_yes(args));

            let status = run_build(&config, &options, &mut console)?;
            tracing::info!(?status, "build pass finished");
            Ok(ExitCode::SUCCESS)
        }
        Some(("run", args)) => {
            let options = cli::run_options(&mut config, args);
            let mut stdout = io::stdout();

            let summary = run_matrix(&config, &options, &mut stdout).await?;
            stdout.flush()?;
            Ok(if summary.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}
