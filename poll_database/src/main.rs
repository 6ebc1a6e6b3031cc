// Poll database queue simulation.
//
// ```console
// $ cargo run --release -p poll_database
// The average product wait time is 24 minutes and 29 seconds.
// The average customer wait time is 3 minutes and 48 seconds.
// ```

use std::process::ExitCode;

use clap::Parser;
use poll_database::cli::CliArgs;
use poll_database::{
    PoolKind, Result, SimulationConfig, SimulationError, WaitTimeReport, average_mean_wait,
    output, run, run_replications,
};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = args.logging_config().init() {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_cli(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(args: &CliArgs) -> Result<()> {
    let config = args.to_config()?;
    config.validate()?;
    info!(?config, "configuration loaded");

    if args.replications == 1 {
        let results = run(&config)?;
        for line in results.report_lines()? {
            println!("{line}");
        }
        if let Some(dir) = &args.output_dir {
            output::write_all(dir, &config, &results)?;
            info!(dir = %dir.display(), "results written");
        }
        return Ok(());
    }

    let results = run_replications(&config, args.replications as usize, args.threads)?;
    for pool in PoolKind::ALL {
        match average_mean_wait(&results, pool) {
            Ok(mean) => println!("{}", WaitTimeReport::from_mean(pool, mean)),
            Err(SimulationError::EmptySeries(_)) => println!(
                "The average {pool} wait time is unavailable: no arrivals completed service."
            ),
            Err(e) => return Err(e),
        }
    }
    if let Some(dir) = &args.output_dir {
        for result in &results {
            let replication = SimulationConfig {
                seed: result.seed,
                ..config.clone()
            };
            output::write_all(dir.join(format!("seed_{}", result.seed)), &replication, result)?;
        }
        info!(dir = %dir.display(), replications = results.len(), "results written");
    }

    Ok(())
}
