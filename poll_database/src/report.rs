use std::fmt;

use crate::{PoolKind, Result, SimulationError, WaitTimeSeries};

/// A mean wait time split into whole minutes and rounded seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeReport {
    pub pool: PoolKind,
    pub minutes: i64,
    pub seconds: i64,
}

impl WaitTimeReport {
    /// Seconds round half-to-even; a result of 60 carries into the minutes.
    pub fn from_mean(pool: PoolKind, mean_minutes: f64) -> Self {
        let whole = mean_minutes.div_euclid(1.0);
        let fraction = mean_minutes.rem_euclid(1.0);

        let mut minutes = whole.round_ties_even() as i64;
        let mut seconds = (fraction * 60.0).round_ties_even() as i64;
        if seconds == 60 {
            minutes += 1;
            seconds = 0;
        }

        WaitTimeReport {
            pool,
            minutes,
            seconds,
        }
    }

    pub fn from_series(series: &WaitTimeSeries) -> Result<Self> {
        Ok(Self::from_mean(series.pool, series.mean()?))
    }
}

impl fmt::Display for WaitTimeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The average {} wait time is {} minutes and {} seconds.",
            self.pool, self.minutes, self.seconds
        )
    }
}

/// The human-readable result line for one pool.
pub fn report_line(series: &WaitTimeSeries) -> Result<String> {
    match WaitTimeReport::from_series(series) {
        Ok(report) => Ok(report.to_string()),
        Err(SimulationError::EmptySeries(pool)) => Ok(format!(
            "The average {pool} wait time is unavailable: no arrivals completed service."
        )),
        Err(e) => Err(e),
    }
}
