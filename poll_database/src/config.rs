//! Simulation configuration.
//!
//! Defaults reproduce the poll database scenario: a burst of queued product
//! and customer exposure calculations at t=0, one more of each every 0.2
//! minutes, each pool served one at a time, run for 54 minutes.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{PoolKind, Result, SimulationError};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_HORIZON_MINUTES: f64 = 54.0;
pub const DEFAULT_INTER_ARRIVAL_MINUTES: f64 = 0.20;

pub const PRODUCT_BURST: usize = 14711;
pub const CUSTOMER_BURST: usize = 23071;
/// 0.2 seconds expressed in minutes.
pub const PRODUCT_SERVICE_MINUTES: f64 = 0.2 / 60.0;
/// 0.02 seconds expressed in minutes.
pub const CUSTOMER_SERVICE_MINUTES: f64 = 0.02 / 60.0;

/// Spacing between consecutive arrivals after the initial burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum InterArrival {
    Fixed { minutes: f64 },
    /// Exponentially distributed gaps drawn from the run's seeded RNG
    Exponential { mean_minutes: f64 },
}

impl InterArrival {
    pub fn mean_minutes(&self) -> f64 {
        match self {
            InterArrival::Fixed { minutes } => *minutes,
            InterArrival::Exponential { mean_minutes } => *mean_minutes,
        }
    }

    fn validate(&self, pool: PoolKind) -> Result<()> {
        let mean = self.mean_minutes();
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SimulationError::invalid_configuration(format!(
                "{pool} inter-arrival interval must be a positive number of minutes, got {mean}"
            )));
        }
        Ok(())
    }
}

impl Default for InterArrival {
    fn default() -> Self {
        InterArrival::Fixed {
            minutes: DEFAULT_INTER_ARRIVAL_MINUTES,
        }
    }
}

/// Which interval a recorded wait time covers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum WaitMeasure {
    /// Arrival until the pool is granted; service time excluded
    #[default]
    UntilGrant,
    /// Arrival until service ends and the pool is released
    UntilRelease,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub kind: PoolKind,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Arrivals queued at t=0
    pub burst: usize,
    #[serde(default)]
    pub inter_arrival: InterArrival,
    pub service_minutes: f64,
}

fn default_capacity() -> usize {
    1
}

impl PoolConfig {
    pub fn product() -> Self {
        PoolConfig {
            kind: PoolKind::Product,
            capacity: 1,
            burst: PRODUCT_BURST,
            inter_arrival: InterArrival::default(),
            service_minutes: PRODUCT_SERVICE_MINUTES,
        }
    }

    pub fn customer() -> Self {
        PoolConfig {
            kind: PoolKind::Customer,
            capacity: 1,
            burst: CUSTOMER_BURST,
            inter_arrival: InterArrival::default(),
            service_minutes: CUSTOMER_SERVICE_MINUTES,
        }
    }

    pub fn for_kind(kind: PoolKind) -> Self {
        match kind {
            PoolKind::Product => Self::product(),
            PoolKind::Customer => Self::customer(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity < 1 {
            return Err(SimulationError::invalid_configuration(format!(
                "{} pool capacity must be at least 1, got {}",
                self.kind, self.capacity
            )));
        }
        self.inter_arrival.validate(self.kind)?;
        if !self.service_minutes.is_finite() || self.service_minutes < 0.0 {
            return Err(SimulationError::invalid_configuration(format!(
                "{} service duration must be a non-negative number of minutes, got {}",
                self.kind, self.service_minutes
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Simulated minutes after which pending work is abandoned
    pub horizon: f64,
    /// Seed every wait-time series with a zero sample before the run
    pub include_sentinel: bool,
    pub wait_measure: WaitMeasure,
    pub pools: Vec<PoolConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: DEFAULT_SEED,
            horizon: DEFAULT_HORIZON_MINUTES,
            include_sentinel: false,
            wait_measure: WaitMeasure::UntilGrant,
            pools: vec![PoolConfig::product(), PoolConfig::customer()],
        }
    }
}

impl SimulationConfig {
    /// The scenario exactly as the poll database script wires it: only the
    /// product stream runs, both series start with a zero sample, and waits
    /// are measured until the pool is released.
    pub fn legacy() -> Self {
        SimulationConfig {
            include_sentinel: true,
            wait_measure: WaitMeasure::UntilRelease,
            pools: vec![PoolConfig::product()],
            ..Self::default()
        }
    }

    /// Keep only the listed pools, in their configured order.
    pub fn with_pools(mut self, kinds: &[PoolKind]) -> Self {
        self.pools.retain(|pool| kinds.contains(&pool.kind));
        self
    }

    pub fn pool(&self, kind: PoolKind) -> Option<&PoolConfig> {
        self.pools.iter().find(|pool| pool.kind == kind)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.horizon.is_finite() || self.horizon < 0.0 {
            return Err(SimulationError::invalid_configuration(format!(
                "horizon must be a non-negative number of minutes, got {}",
                self.horizon
            )));
        }
        if self.pools.is_empty() {
            return Err(SimulationError::invalid_configuration(
                "at least one pool must be enabled",
            ));
        }

        let mut seen = HashSet::new();
        for pool in &self.pools {
            if !seen.insert(pool.kind) {
                return Err(SimulationError::invalid_configuration(format!(
                    "{} pool is configured more than once",
                    pool.kind
                )));
            }
            pool.validate()?;

            // the arrival clock must still advance when it gets near the horizon
            let interval = pool.inter_arrival.mean_minutes();
            if self.horizon + interval <= self.horizon {
                return Err(SimulationError::invalid_configuration(format!(
                    "{} inter-arrival interval {interval} is too small to advance the clock \
                     up to the {} minute horizon",
                    pool.kind, self.horizon
                )));
            }
        }
        Ok(())
    }
}
