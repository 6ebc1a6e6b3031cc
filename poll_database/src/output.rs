//! Export of run results for offline analysis.
//!
//! `write_all` creates:
//! - `wait_times.csv`: one row per recorded sample
//! - `summary.json`: configuration plus per-pool aggregates

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::{PoolKind, Result, SimulationConfig, SimulationResults};

#[derive(Debug, Serialize)]
struct WaitTimeRow {
    pool: PoolKind,
    arrival_id: Option<usize>,
    wait_minutes: f64,
    sentinel: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolSummary {
    pub pool: PoolKind,
    pub samples: usize,
    pub measured_samples: usize,
    pub mean_wait_minutes: Option<f64>,
    pub max_wait_minutes: Option<f64>,
    pub arrivals: usize,
    pub completed: usize,
    pub max_queue_length: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub config: SimulationConfig,
    pub pools: Vec<PoolSummary>,
}

impl RunSummary {
    pub fn new(config: &SimulationConfig, results: &SimulationResults) -> Self {
        let pools = PoolKind::ALL
            .iter()
            .map(|pool| {
                let series = results.series(*pool);
                PoolSummary {
                    pool: *pool,
                    samples: series.map_or(0, |s| s.len()),
                    measured_samples: series.map_or(0, |s| s.measured().len()),
                    mean_wait_minutes: results.mean_wait(*pool).ok(),
                    max_wait_minutes: series.and_then(|s| s.max()),
                    arrivals: results
                        .generators
                        .get(pool)
                        .map_or(0, |g| g.total_arrivals()),
                    completed: results.services.get(pool).map_or(0, |s| s.completed),
                    max_queue_length: results
                        .resources
                        .get(pool)
                        .map_or(0, |r| r.max_queue_length),
                }
            })
            .collect();

        RunSummary {
            config: config.clone(),
            pools,
        }
    }
}

/// Write every wait-time sample, sentinel rows included, to CSV
pub fn write_wait_times_csv<P: AsRef<Path>>(results: &SimulationResults, path: P) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for series in results.wait_times.values() {
        for sample in series.samples() {
            wtr.serialize(WaitTimeRow {
                pool: series.pool,
                arrival_id: sample.arrival_id,
                wait_minutes: sample.wait,
                sentinel: sample.arrival_id.is_none(),
            })?;
        }
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_summary_json<P: AsRef<Path>>(
    config: &SimulationConfig,
    results: &SimulationResults,
    path: P,
) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunSummary::new(config, results))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_all<P: AsRef<Path>>(
    dir: P,
    config: &SimulationConfig,
    results: &SimulationResults,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    write_wait_times_csv(results, dir.join("wait_times.csv"))?;
    write_summary_json(config, results, dir.join("summary.json"))?;

    Ok(())
}
