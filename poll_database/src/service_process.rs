use des::{Agent, Response};
use tracing::trace;

use crate::{Arrival, Event, PoolConfig, PoolKind, ServiceStats, Stats, WaitMeasure};

/// Drives each arrival of one pool through request, hold and release.
///
/// Every arrival is an independent continuation carried by its events, so
/// this agent keeps only counters.
pub struct ServiceProcess {
    pool: PoolKind,
    service_minutes: f64,
    wait_measure: WaitMeasure,
    stats: ServiceStats,
}

impl ServiceProcess {
    pub fn new(config: &PoolConfig, wait_measure: WaitMeasure) -> Self {
        Self {
            pool: config.kind,
            service_minutes: config.service_minutes,
            wait_measure,
            stats: ServiceStats::new(config.kind),
        }
    }

    fn complete(
        &mut self,
        current_t: f64,
        arrival: &Arrival,
        granted_at: f64,
    ) -> Response<Event, Stats> {
        self.stats.completed += 1;
        self.stats.total_service_time += current_t - granted_at;

        let wait = match self.wait_measure {
            WaitMeasure::UntilGrant => granted_at - arrival.arrived_at,
            WaitMeasure::UntilRelease => current_t - arrival.arrived_at,
        };
        trace!(pool = %self.pool, arrival = arrival.id, wait, "service completed");

        Response::events(vec![
            (
                current_t,
                Event::ResourceReleased {
                    pool: self.pool,
                    arrival_id: arrival.id,
                },
            ),
            (
                current_t,
                Event::WaitRecorded {
                    pool: self.pool,
                    arrival_id: arrival.id,
                    wait,
                },
            ),
        ])
    }
}

impl Agent<Event, Stats> for ServiceProcess {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::Arrived { pool, arrival } if *pool == self.pool => {
                self.stats.started += 1;
                Response::event(
                    current_t,
                    Event::ResourceRequested {
                        pool: self.pool,
                        arrival: *arrival,
                    },
                )
            }
            Event::ResourceAcquired { pool, arrival } if *pool == self.pool => {
                self.stats.granted += 1;
                Response::event(
                    current_t + self.service_minutes,
                    Event::ServiceCompleted {
                        pool: self.pool,
                        arrival: *arrival,
                        granted_at: current_t,
                    },
                )
            }
            Event::ServiceCompleted {
                pool,
                arrival,
                granted_at,
            } if *pool == self.pool => self.complete(current_t, arrival, *granted_at),
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::ServiceStats(self.stats.clone())
    }
}
