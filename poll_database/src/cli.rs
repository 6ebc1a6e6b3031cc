//! Command line arguments for the `poll_database` binary.
//!
//! Settings resolve in order: flags, then `--config` (or `--legacy`), then
//! built-in defaults.

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use crate::{LoggingConfig, PoolConfig, PoolKind, Result, SimulationConfig, WaitMeasure};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "poll_database",
    version,
    about = "Simulate the poll database exposure calculation queues",
    long_about = "Simulates the backlog of product and customer exposure calculations \
                  served by the poll database and prints the average wait per pool.

EXAMPLES:
    # Reference scenario
    poll_database

    # Product stream only, waits measured until release
    poll_database --legacy

    # Fifty seeded replications with exponential arrivals from a file
    poll_database --config scenario.toml --replications 50"
)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(short, long, conflicts_with = "legacy")]
    pub config: Option<PathBuf>,

    /// Start from the product-only, release-measured scenario
    #[arg(long)]
    pub legacy: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated minutes to run
    #[arg(long)]
    pub horizon: Option<f64>,

    /// Pools to simulate, e.g. `--pools product,customer`
    #[arg(long, value_enum, value_delimiter = ',')]
    pub pools: Option<Vec<PoolKind>>,

    /// Seed each wait-time series with a zero sample
    #[arg(long, conflicts_with = "no_sentinel")]
    pub include_sentinel: bool,

    /// Drop the zero sample even if `--legacy` or the config file enables it
    #[arg(long)]
    pub no_sentinel: bool,

    #[arg(long, value_enum)]
    pub wait_measure: Option<WaitMeasure>,

    /// Independent runs with seeds seed, seed+1, ...
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub replications: u32,

    /// Worker threads for replications (defaults to all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Directory for wait_times.csv and summary.json
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long)]
    pub debug: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,

    /// Log filter directives, e.g. `poll_database=trace,des=debug`
    /// (overrides `RUST_LOG`, `--verbose` and `--debug`)
    #[arg(long, value_name = "DIRECTIVES")]
    pub log_filter: Option<String>,
}

impl CliArgs {
    pub fn to_config(&self) -> Result<SimulationConfig> {
        let mut config = match (&self.config, self.legacy) {
            (Some(path), _) => SimulationConfig::from_file(path)?,
            (None, true) => SimulationConfig::legacy(),
            (None, false) => SimulationConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if self.include_sentinel {
            config.include_sentinel = true;
        }
        if self.no_sentinel {
            config.include_sentinel = false;
        }
        if let Some(measure) = self.wait_measure {
            config.wait_measure = measure;
        }
        if let Some(kinds) = &self.pools {
            for kind in kinds {
                if config.pool(*kind).is_none() {
                    config.pools.push(PoolConfig::for_kind(*kind));
                }
            }
            config = config.with_pools(kinds);
        }

        Ok(config)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let level = if self.debug {
            Level::DEBUG
        } else if self.verbose {
            Level::INFO
        } else {
            Level::WARN
        };

        let mut logging = LoggingConfig::new().with_level(level);
        if self.no_color {
            logging = logging.without_ansi();
        }
        if let Some(filter) = &self.log_filter {
            logging = logging.with_env_filter(filter);
        }
        logging
    }
}
