//! Error types for configuring, running and reporting a simulation.

use thiserror::Error;

use crate::PoolKind;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// Rejected before any event is scheduled
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A mean was requested over a series with no samples
    #[error("no wait-time samples recorded for the {0} pool")]
    EmptySeries(PoolKind),

    #[error("event scheduling failed: {0}")]
    Scheduling(#[from] des::DesError),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("replication failed: {0}")]
    Replication(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
