//! treestat CLI entry point

use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use treestat::config::{self, cli::Cli, validator};
use treestat::coordinator::GroupCoordinator;
use treestat::dataset::Dataset;
use treestat::output::{self, Report};
use treestat::stats::serial::SerialCheck;
use treestat::topology::ProcessTopology;

/// Exit status when the parallel result disagrees with the serial check
const SERIAL_CHECK_FAILED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the report
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    cli.validate()?;

    let config = config::load(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;
    let topology = ProcessTopology::new(config.run.workers)?;

    if cli.dry_run {
        println!("{}", config);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(ExitCode::SUCCESS);
    }

    let cpus = num_cpus::get();
    if topology.size() > cpus {
        warn!(workers = topology.size(), cpus, "more workers than CPUs, workers will share cores");
    }

    let dataset = Dataset::load(&config.dataset).context("Failed to load dataset")?;
    info!("read {} values", dataset.len());

    let outcome = GroupCoordinator::new(topology)
        .with_partition_limit(config.run.max_partition_bytes)
        .run(dataset)?;

    let serial_check = config
        .run
        .serial_check
        .then(|| SerialCheck::run(&outcome.moments, outcome.dataset.values(), config.run.tolerance));

    let report = Report::new(&outcome, serial_check);
    drop(outcome);
    output::report(&report, &config.output)?;

    if !report.passed() {
        warn!(tolerance = config.run.tolerance, "parallel result disagrees with serial computation");
        return Ok(ExitCode::from(SERIAL_CHECK_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}
