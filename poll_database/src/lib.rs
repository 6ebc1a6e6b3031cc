use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Modules
// ============================================================================

pub mod arrival_generator;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;
pub mod resource;
pub mod service_process;
pub mod simulation;
pub mod wait_time_collector;

pub use arrival_generator::ArrivalGenerator;
pub use config::{InterArrival, PoolConfig, SimulationConfig, WaitMeasure};
pub use error::{Result, SimulationError};
pub use logging::LoggingConfig;
pub use report::{WaitTimeReport, report_line};
pub use resource::Resource;
pub use service_process::ServiceProcess;
pub use simulation::{
    SimulationResults, average_mean_wait, build_event_loop, run, run_replications,
};
pub use wait_time_collector::{WaitSample, WaitTimeCollector, WaitTimeSeries};

// ============================================================================
// Pools
// ============================================================================

/// The two exposure calculations that compete for their own server.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Product,
    Customer,
}

impl PoolKind {
    pub const ALL: [PoolKind; 2] = [PoolKind::Product, PoolKind::Customer];

    pub fn label(&self) -> &'static str {
        match self {
            PoolKind::Product => "product",
            PoolKind::Customer => "customer",
        }
    }

    /// Stable per-pool offset used to derive independent RNG streams.
    pub fn stream_id(&self) -> u64 {
        match self {
            PoolKind::Product => 0,
            PoolKind::Customer => 1,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Events
// ============================================================================

/// A unit of work entering a pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub id: usize,
    pub arrived_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,

    // Arrival stream
    ArrivalTick {
        pool: PoolKind,
    },
    Arrived {
        pool: PoolKind,
        arrival: Arrival,
    },

    // Pool admission
    ResourceRequested {
        pool: PoolKind,
        arrival: Arrival,
    },
    ResourceAcquired {
        pool: PoolKind,
        arrival: Arrival,
    },
    ResourceReleased {
        pool: PoolKind,
        arrival_id: usize,
    },

    // Service outcome
    ServiceCompleted {
        pool: PoolKind,
        arrival: Arrival,
        granted_at: f64,
    },
    WaitRecorded {
        pool: PoolKind,
        arrival_id: usize,
        wait: f64,
    },
}

impl Event {
    /// The pool an event belongs to; `Start` is addressed to every pool.
    pub fn pool(&self) -> Option<PoolKind> {
        match self {
            Event::Start => None,
            Event::ArrivalTick { pool }
            | Event::Arrived { pool, .. }
            | Event::ResourceRequested { pool, .. }
            | Event::ResourceAcquired { pool, .. }
            | Event::ResourceReleased { pool, .. }
            | Event::ServiceCompleted { pool, .. }
            | Event::WaitRecorded { pool, .. } => Some(*pool),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone)]
pub enum Stats {
    GeneratorStats(GeneratorStats),
    ServiceStats(ServiceStats),
    ResourceStats(ResourceStats),
    WaitTimes(WaitTimeSeries),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorStats {
    pub pool: PoolKind,
    pub burst_arrivals: usize,
    pub periodic_arrivals: usize,
}

impl GeneratorStats {
    pub fn new(pool: PoolKind) -> Self {
        Self {
            pool,
            burst_arrivals: 0,
            periodic_arrivals: 0,
        }
    }

    pub fn total_arrivals(&self) -> usize {
        self.burst_arrivals + self.periodic_arrivals
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStats {
    pub pool: PoolKind,
    /// Arrivals that began their service process.
    pub started: usize,
    /// Arrivals granted the pool.
    pub granted: usize,
    /// Arrivals that finished service and released the pool.
    pub completed: usize,
    pub total_service_time: f64,
}

impl ServiceStats {
    pub fn new(pool: PoolKind) -> Self {
        Self {
            pool,
            started: 0,
            granted: 0,
            completed: 0,
            total_service_time: 0.0,
        }
    }

    /// Arrivals still queued or in service when the run stopped.
    pub fn in_flight(&self) -> usize {
        self.started.saturating_sub(self.completed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceStats {
    pub pool: PoolKind,
    pub capacity: usize,

    // Current state
    pub current_holders: usize,
    pub current_queue_length: usize,

    // Cumulative metrics
    pub total_requests: usize,
    pub total_granted: usize,
    pub total_released: usize,
    pub max_queue_length: usize,
}

impl ResourceStats {
    pub fn new(pool: PoolKind, capacity: usize) -> Self {
        Self {
            pool,
            capacity,
            current_holders: 0,
            current_queue_length: 0,
            total_requests: 0,
            total_granted: 0,
            total_released: 0,
            max_queue_length: 0,
        }
    }

    pub fn is_at_capacity(&self) -> bool {
        self.current_holders >= self.capacity
    }

    pub fn has_queue(&self) -> bool {
        self.current_queue_length > 0
    }

    pub fn utilization(&self) -> f64 {
        self.current_holders as f64 / self.capacity as f64
    }
}
