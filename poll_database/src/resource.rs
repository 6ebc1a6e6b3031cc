use std::collections::VecDeque;

use des::{Agent, Response};
use tracing::{trace, warn};

use crate::{Arrival, Event, PoolKind, ResourceStats, Result, SimulationError, Stats};

/// A capacity-limited server granting its slots in strict arrival order.
pub struct Resource {
    pool: PoolKind,
    capacity: usize,
    holders: usize,
    queue: VecDeque<Arrival>,
    stats: ResourceStats,
}

impl Resource {
    pub fn new(pool: PoolKind, capacity: usize) -> Result<Resource> {
        if capacity < 1 {
            return Err(SimulationError::invalid_configuration(format!(
                "{pool} pool capacity must be at least 1, got {capacity}"
            )));
        }
        Ok(Resource {
            pool,
            capacity,
            holders: 0,
            queue: VecDeque::new(),
            stats: ResourceStats::new(pool, capacity),
        })
    }

    fn grant(&mut self, current_t: f64, arrival: Arrival) -> Response<Event, Stats> {
        self.holders += 1;
        self.stats.total_granted += 1;
        trace!(pool = %self.pool, arrival = arrival.id, t = current_t, "pool granted");
        Response::event(
            current_t,
            Event::ResourceAcquired {
                pool: self.pool,
                arrival,
            },
        )
    }

    fn request(&mut self, current_t: f64, arrival: Arrival) -> Response<Event, Stats> {
        self.stats.total_requests += 1;
        if self.holders < self.capacity && self.queue.is_empty() {
            return self.grant(current_t, arrival);
        }

        // pool occupied: wait in line until a release reaches this arrival
        self.queue.push_back(arrival);
        self.stats.max_queue_length = self.stats.max_queue_length.max(self.queue.len());
        Response::new()
    }

    fn release(&mut self, current_t: f64, arrival_id: usize) -> Response<Event, Stats> {
        if self.holders == 0 {
            warn!(pool = %self.pool, arrival = arrival_id, "release without a holder ignored");
            return Response::new();
        }
        self.holders -= 1;
        self.stats.total_released += 1;

        // hand the slot straight to the head of the queue, same instant
        match self.queue.pop_front() {
            Some(next) => self.grant(current_t, next),
            None => Response::new(),
        }
    }
}

impl Agent<Event, Stats> for Resource {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::ResourceRequested { pool, arrival } if *pool == self.pool => {
                self.request(current_t, *arrival)
            }
            Event::ResourceReleased { pool, arrival_id } if *pool == self.pool => {
                self.release(current_t, *arrival_id)
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        let mut stats = self.stats.clone();
        stats.current_holders = self.holders;
        stats.current_queue_length = self.queue.len();
        Stats::ResourceStats(stats)
    }
}
