//! Wait-time accumulation per pool.
//!
//! A series may start with a zero-valued sentinel sample (see
//! [`SimulationConfig::include_sentinel`](crate::SimulationConfig)). The
//! sentinel takes part in [`WaitTimeSeries::mean`] but is excluded from
//! [`WaitTimeSeries::measured`], which holds one sample per completed arrival.

use des::{Agent, Response};
use serde::Serialize;
use tracing::trace;

use crate::{Event, PoolKind, Result, SimulationError, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaitSample {
    /// `None` for the sentinel
    pub arrival_id: Option<usize>,
    pub wait: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitTimeSeries {
    pub pool: PoolKind,
    samples: Vec<WaitSample>,
}

impl WaitTimeSeries {
    pub fn new(pool: PoolKind, include_sentinel: bool) -> Self {
        let mut samples = Vec::new();
        if include_sentinel {
            samples.push(WaitSample {
                arrival_id: None,
                wait: 0.0,
            });
        }
        Self { pool, samples }
    }

    pub fn record(&mut self, arrival_id: usize, wait: f64) {
        self.samples.push(WaitSample {
            arrival_id: Some(arrival_id),
            wait,
        });
    }

    /// All samples in recording order, sentinel first if present.
    pub fn samples(&self) -> &[WaitSample] {
        &self.samples
    }

    pub fn has_sentinel(&self) -> bool {
        self.samples
            .first()
            .is_some_and(|sample| sample.arrival_id.is_none())
    }

    /// Samples recorded for completed arrivals.
    pub fn measured(&self) -> &[WaitSample] {
        if self.has_sentinel() {
            &self.samples[1..]
        } else {
            &self.samples
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn waits(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|sample| sample.wait)
    }

    /// Arithmetic mean over every sample, sentinel included.
    pub fn mean(&self) -> Result<f64> {
        if self.samples.is_empty() {
            return Err(SimulationError::EmptySeries(self.pool));
        }
        Ok(self.waits().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.waits().reduce(f64::max)
    }
}

/// Appends every `WaitRecorded` event of its pool to a [`WaitTimeSeries`].
pub struct WaitTimeCollector {
    series: WaitTimeSeries,
}

impl WaitTimeCollector {
    pub fn new(pool: PoolKind, include_sentinel: bool) -> Self {
        Self {
            series: WaitTimeSeries::new(pool, include_sentinel),
        }
    }
}

impl Agent<Event, Stats> for WaitTimeCollector {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        if let Event::WaitRecorded {
            pool,
            arrival_id,
            wait,
        } = data
        {
            if *pool == self.series.pool {
                trace!(pool = %pool, arrival = arrival_id, wait, t = current_t, "wait recorded");
                self.series.record(*arrival_id, *wait);
            }
        }
        Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::WaitTimes(self.series.clone())
    }
}
