//! Binary entry point for branchsweep.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for errors raised before logging is up
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use branchsweep::cli::Cli;
use branchsweep::output::{DELETED_BRANCHES_KEY, JobOutput};
use branchsweep::{BranchSweeper, GithubClient, SweepResult, observability};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init_from_env(cli.init_options()) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(result) => {
            info!("{}", result.summary());
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!(error = %e, "Branch sweep failed");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> branchsweep::Result<SweepResult> {
    let config = cli.into_config()?;
    info!(
        repository = %config.repository,
        strategy = %config.strategy,
        dry_run = config.dry_run,
        branch_limit = config.branch_limit,
        last_commit_age_days = config.last_commit_age_days,
        "Starting branch sweep"
    );

    let client = GithubClient::from_config(&config);
    let result = BranchSweeper::new(&client, &config).run()?;

    let output = JobOutput::from_env();
    if let Err(e) = output.write_branches(DELETED_BRANCHES_KEY, &result.branches) {
        warn!(error = %e, "Failed to write job output");
    }
    Ok(result)
}
