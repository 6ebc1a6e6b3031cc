use des::{Agent, Response};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Exp};
use tracing::debug;

use crate::{
    Arrival, Event, GeneratorStats, InterArrival, PoolConfig, PoolKind, Result, SimulationError,
    Stats,
};

enum Spacing {
    Fixed(f64),
    Exponential(Exp<f64>),
}

/// Emits a burst of arrivals on `Start`, then one arrival per tick forever.
///
/// The stream is lazy: only the next tick is ever on the queue, so the event
/// loop's horizon is what bounds it.
pub struct ArrivalGenerator {
    pool: PoolKind,
    burst: usize,
    spacing: Spacing,
    next_arrival_id: usize,
    rng: StdRng,
    stats: GeneratorStats,
}

impl ArrivalGenerator {
    pub fn new(config: &PoolConfig, seed: u64) -> Result<Self> {
        let spacing = match config.inter_arrival {
            InterArrival::Fixed { minutes } => Spacing::Fixed(minutes),
            InterArrival::Exponential { mean_minutes } => Spacing::Exponential(
                Exp::new(1.0 / mean_minutes).map_err(|e| {
                    SimulationError::invalid_configuration(format!(
                        "{} inter-arrival distribution: {e}",
                        config.kind
                    ))
                })?,
            ),
        };

        Ok(Self {
            pool: config.kind,
            burst: config.burst,
            spacing,
            next_arrival_id: 0,
            rng: StdRng::seed_from_u64(
                seed.wrapping_mul(1000)
                    .wrapping_add(config.kind.stream_id()),
            ),
            stats: GeneratorStats::new(config.kind),
        })
    }

    fn next_interval(&mut self) -> f64 {
        match &self.spacing {
            Spacing::Fixed(minutes) => *minutes,
            Spacing::Exponential(exp) => exp.sample(&mut self.rng),
        }
    }

    fn new_arrival(&mut self, current_t: f64) -> (f64, Event) {
        let arrival = Arrival {
            id: self.next_arrival_id,
            arrived_at: current_t,
        };
        self.next_arrival_id += 1;
        (
            current_t,
            Event::Arrived {
                pool: self.pool,
                arrival,
            },
        )
    }

    fn next_tick(&mut self, current_t: f64) -> (f64, Event) {
        let interval = self.next_interval();
        (current_t + interval, Event::ArrivalTick { pool: self.pool })
    }
}

impl Agent<Event, Stats> for ArrivalGenerator {
    fn act(&mut self, current_t: f64, data: &Event) -> Response<Event, Stats> {
        match data {
            Event::Start => {
                let mut events = Vec::with_capacity(self.burst + 1);
                for _ in 0..self.burst {
                    events.push(self.new_arrival(current_t));
                }
                self.stats.burst_arrivals += self.burst;
                events.push(self.next_tick(current_t));
                debug!(pool = %self.pool, burst = self.burst, t = current_t, "arrival burst emitted");
                Response::events(events)
            }
            Event::ArrivalTick { pool } if *pool == self.pool => {
                self.stats.periodic_arrivals += 1;
                let arrival = self.new_arrival(current_t);
                let tick = self.next_tick(current_t);
                Response::events(vec![arrival, tick])
            }
            _ => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::GeneratorStats(self.stats.clone())
    }
}
