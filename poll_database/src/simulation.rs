//! Wires pools, arrival streams and collectors into one event loop and runs
//! it to the configured horizon.

use std::collections::BTreeMap;

use des::parallel::{ParallelRunner, simple_progress_reporter};
use des::{Agent, EventLoop};
use tracing::info;

use crate::{
    ArrivalGenerator, Event, GeneratorStats, PoolKind, Resource, ResourceStats, Result,
    ServiceProcess, ServiceStats, SimulationConfig, SimulationError, Stats, WaitTimeCollector,
    WaitTimeReport, WaitTimeSeries, report_line,
};

/// Everything the agents reported once the run stopped, keyed by pool.
#[derive(Debug, Clone)]
pub struct SimulationResults {
    pub seed: u64,
    pub horizon: f64,
    pub wait_times: BTreeMap<PoolKind, WaitTimeSeries>,
    pub generators: BTreeMap<PoolKind, GeneratorStats>,
    pub services: BTreeMap<PoolKind, ServiceStats>,
    pub resources: BTreeMap<PoolKind, ResourceStats>,
}

impl SimulationResults {
    pub fn from_stats(seed: u64, horizon: f64, stats: Vec<Stats>) -> Self {
        let mut results = SimulationResults {
            seed,
            horizon,
            wait_times: BTreeMap::new(),
            generators: BTreeMap::new(),
            services: BTreeMap::new(),
            resources: BTreeMap::new(),
        };
        for stat in stats {
            match stat {
                Stats::WaitTimes(series) => {
                    results.wait_times.insert(series.pool, series);
                }
                Stats::GeneratorStats(s) => {
                    results.generators.insert(s.pool, s);
                }
                Stats::ServiceStats(s) => {
                    results.services.insert(s.pool, s);
                }
                Stats::ResourceStats(s) => {
                    results.resources.insert(s.pool, s);
                }
            }
        }
        results
    }

    pub fn series(&self, pool: PoolKind) -> Option<&WaitTimeSeries> {
        self.wait_times.get(&pool)
    }

    pub fn mean_wait(&self, pool: PoolKind) -> Result<f64> {
        self.series(pool)
            .ok_or(SimulationError::EmptySeries(pool))?
            .mean()
    }

    pub fn report(&self, pool: PoolKind) -> Result<WaitTimeReport> {
        Ok(WaitTimeReport::from_mean(pool, self.mean_wait(pool)?))
    }

    /// One line per pool kind, product first.
    pub fn report_lines(&self) -> Result<Vec<String>> {
        PoolKind::ALL
            .iter()
            .map(|pool| match self.series(*pool) {
                Some(series) => report_line(series),
                None => report_line(&WaitTimeSeries::new(*pool, false)),
            })
            .collect()
    }
}

/// Build the event loop for `config`: one generator, service process and
/// resource per configured pool, plus a wait-time collector for every pool
/// kind so that unconfigured pools still report.
pub fn build_event_loop(config: &SimulationConfig) -> Result<EventLoop<Event, Stats>> {
    config.validate()?;

    let mut agents: Vec<Box<dyn Agent<Event, Stats>>> = Vec::new();
    for pool in &config.pools {
        agents.push(Box::new(ArrivalGenerator::new(pool, config.seed)?));
        agents.push(Box::new(ServiceProcess::new(pool, config.wait_measure)));
        agents.push(Box::new(Resource::new(pool.kind, pool.capacity)?));
    }
    for pool in PoolKind::ALL {
        agents.push(Box::new(WaitTimeCollector::new(
            pool,
            config.include_sentinel,
        )));
    }

    Ok(EventLoop::new(vec![(0.0, Event::Start)], agents))
}

pub fn run(config: &SimulationConfig) -> Result<SimulationResults> {
    let mut event_loop = build_event_loop(config)?;
    info!(
        seed = config.seed,
        horizon = config.horizon,
        pools = config.pools.len(),
        "running simulation"
    );

    event_loop.run(config.horizon)?;

    info!(
        processed = event_loop.processed(),
        abandoned = event_loop.pending(),
        clock = event_loop.current_t(),
        "simulation complete"
    );
    Ok(SimulationResults::from_stats(
        config.seed,
        config.horizon,
        event_loop.stats(),
    ))
}

pub fn replication_seed(base: u64, replication: usize) -> u64 {
    base.wrapping_add(replication as u64)
}

/// Run `replications` copies of `config` in parallel, the i-th seeded with
/// `seed + i`. Results come back in replication order.
pub fn run_replications(
    config: &SimulationConfig,
    replications: usize,
    threads: Option<usize>,
) -> Result<Vec<SimulationResults>> {
    config.validate()?;
    info!(replications, seed = config.seed, "running replications");

    let mut runner = ParallelRunner::new(replications, |replication| {
        build_event_loop(&SimulationConfig {
            seed: replication_seed(config.seed, replication),
            ..config.clone()
        })
    })
    .progress(simple_progress_reporter(10));
    if let Some(threads) = threads {
        runner = runner.num_threads(threads);
    }

    runner
        .run(config.horizon)
        .into_iter()
        .enumerate()
        .map(|(replication, result)| {
            result
                .map(|stats| {
                    SimulationResults::from_stats(
                        replication_seed(config.seed, replication),
                        config.horizon,
                        stats,
                    )
                })
                .map_err(|e| {
                    SimulationError::Replication(format!("replication {replication}: {e}"))
                })
        })
        .collect()
}

/// Mean over replications of each replication's mean wait; replications with
/// no samples for `pool` are skipped.
pub fn average_mean_wait(results: &[SimulationResults], pool: PoolKind) -> Result<f64> {
    let means: Vec<f64> = results
        .iter()
        .filter_map(|r| r.mean_wait(pool).ok())
        .collect();
    if means.is_empty() {
        return Err(SimulationError::EmptySeries(pool));
    }
    Ok(means.iter().sum::<f64>() / means.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InterArrival, PoolConfig};

    fn tiny_config() -> SimulationConfig {
        SimulationConfig {
            horizon: 1.0,
            pools: vec![PoolConfig {
                burst: 3,
                ..PoolConfig::product()
            }],
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = tiny_config();
        config.pools[0].capacity = 0;
        assert!(matches!(
            build_event_loop(&config),
            Err(SimulationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_agents_per_pool() {
        let event_loop = build_event_loop(&tiny_config()).unwrap();
        // generator + service + resource, then one collector per pool kind
        assert_eq!(event_loop.agent_count(), 3 + 2);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn test_unconfigured_pool_still_reports() {
        let results = run(&tiny_config()).unwrap();
        let lines = results.report_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("The average product wait time is 0 minutes"));
        assert_eq!(
            lines[1],
            "The average customer wait time is unavailable: no arrivals completed service."
        );
        assert!(results.services.get(&PoolKind::Customer).is_none());
    }

    #[test]
    fn test_replications_use_consecutive_seeds() {
        let results = run_replications(&tiny_config(), 3, Some(2)).unwrap();
        let seeds: Vec<u64> = results.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![42, 43, 44]);
    }

    #[test]
    fn test_fixed_arrivals_ignore_the_seed() {
        let results = run_replications(&tiny_config(), 2, None).unwrap();
        assert_eq!(
            results[0].series(PoolKind::Product),
            results[1].series(PoolKind::Product)
        );
    }

    #[test]
    fn test_exponential_arrivals_vary_with_the_seed() {
        let mut config = tiny_config();
        config.horizon = 20.0;
        config.pools[0].inter_arrival = InterArrival::Exponential { mean_minutes: 0.2 };
        // busy enough that periodic arrivals queue too
        config.pools[0].service_minutes = 0.15;

        let results = run_replications(&config, 2, None).unwrap();
        assert_ne!(
            results[0].series(PoolKind::Product),
            results[1].series(PoolKind::Product)
        );
        assert!(average_mean_wait(&results, PoolKind::Product).is_ok());
        assert!(matches!(
            average_mean_wait(&results, PoolKind::Customer),
            Err(SimulationError::EmptySeries(PoolKind::Customer))
        ));
    }
}
