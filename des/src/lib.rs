//! Discrete-event simulation core.
//!
//! An [`EventLoop`] owns a time-ordered queue of pending events and a set of
//! [`Agent`]s. Each dispatched event is broadcast to every agent; agents answer
//! with a [`Response`] carrying further events (and possibly new agents).
//! Simulated time only moves forward, and events sharing a timestamp are
//! dispatched in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;
use tracing::{debug, trace};

pub mod parallel;

/// Errors raised when an event cannot be placed on the queue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DesError {
    #[error("event scheduled at t={scheduled} is earlier than the current time t={now}")]
    ScheduledInPast { scheduled: f64, now: f64 },
    #[error("event scheduled at non-finite time {0}")]
    NonFiniteTime(f64),
}

struct Event<T> {
    t: f64,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // Reversed so the max-heap pops the earliest (t, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What an agent wants to happen after reacting to an event.
pub struct Response<T, S> {
    pub events: Vec<(f64, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// A single event at absolute time `t`.
    pub fn event(t: f64, data: T) -> Response<T, S> {
        Response {
            events: vec![(t, data)],
            agents: Vec::new(),
        }
    }

    pub fn events(events: Vec<(f64, T)>) -> Response<T, S> {
        Response {
            events,
            agents: Vec::new(),
        }
    }

    pub fn agents(agents: Vec<Box<dyn Agent<T, S>>>) -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents,
        }
    }
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_t: f64, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;
}

pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_t: f64,
    next_seq: u64,
    processed: usize,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    /// Initial events keep their given order among equal timestamps.
    ///
    /// Initial events are not validated; use [`EventLoop::schedule`] when the
    /// times come from untrusted input.
    pub fn new(events: Vec<(f64, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::with_capacity(events.len()),
            current_t: 0.0,
            next_seq: 0,
            processed: 0,
            agents,
        };
        for (t, data) in events {
            event_loop.push(t, data);
        }
        event_loop
    }

    pub fn current_t(&self) -> f64 {
        self.current_t
    }

    /// Number of events still waiting on the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of events dispatched so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Enqueue `data` at absolute time `t`, which must not precede the clock.
    pub fn schedule(&mut self, t: f64, data: T) -> Result<(), DesError> {
        if !t.is_finite() {
            return Err(DesError::NonFiniteTime(t));
        }
        if t < self.current_t {
            return Err(DesError::ScheduledInPast {
                scheduled: t,
                now: self.current_t,
            });
        }
        self.push(t, data);
        Ok(())
    }

    fn push(&mut self, t: f64, data: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Event { t, seq, data });
    }

    fn broadcast(&mut self) -> Result<(), DesError> {
        let Some(event) = self.queue.pop() else {
            return Ok(());
        };
        self.current_t = event.t;
        self.processed += 1;
        trace!(t = event.t, seq = event.seq, "dispatching event");

        let mut new_events = Vec::new();
        let mut new_agents = Vec::<Box<dyn Agent<T, S>>>::new();
        for agent in &mut self.agents {
            let response = agent.act(self.current_t, &event.data);
            new_events.extend(response.events);
            new_agents.extend(response.agents);
        }
        for (t, data) in new_events {
            self.schedule(t, data)?;
        }
        self.agents.extend(new_agents);
        Ok(())
    }

    /// Dispatch events in (time, scheduling order) until the earliest pending
    /// event lies beyond `until`. Events later than `until` remain queued and
    /// are never invoked by this call.
    pub fn run(&mut self, until: f64) -> Result<(), DesError> {
        while let Some(next) = self.queue.peek() {
            if next.t > until {
                break;
            }
            self.broadcast()?;
        }
        debug!(
            until,
            current_t = self.current_t,
            processed = self.processed,
            pending = self.queue.len(),
            "event loop stopped"
        );
        Ok(())
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoddyAgent {}

    impl Agent<u8, usize> for NoddyAgent {
        fn stats(&self) -> usize {
            0
        }
    }

    /// Records every event it sees, in dispatch order.
    struct Recorder {
        seen: Vec<(f64, u8)>,
    }

    impl Agent<u8, Vec<(f64, u8)>> for Recorder {
        fn act(&mut self, current_t: f64, data: &u8) -> Response<u8, Vec<(f64, u8)>> {
            self.seen.push((current_t, *data));
            Response::new()
        }

        fn stats(&self) -> Vec<(f64, u8)> {
            self.seen.clone()
        }
    }

    /// Reschedules itself every `interval`.
    struct Ticker {
        interval: f64,
        ticks: usize,
    }

    impl Agent<u8, usize> for Ticker {
        fn act(&mut self, current_t: f64, _data: &u8) -> Response<u8, usize> {
            self.ticks += 1;
            Response::event(current_t + self.interval, 0)
        }

        fn stats(&self) -> usize {
            self.ticks
        }
    }

    #[test]
    fn min_queue() {
        let mut queue = BinaryHeap::<Event<u8>>::new();
        queue.push(Event { t: 2.0, seq: 0, data: 2 });
        queue.push(Event { t: 1.0, seq: 1, data: 1 });
        assert_eq!(queue.peek().map(|e| e.data), Some(1));
    }

    #[test]
    fn equal_times_pop_in_scheduling_order() {
        let mut queue = BinaryHeap::<Event<u8>>::new();
        queue.push(Event { t: 1.0, seq: 2, data: 3 });
        queue.push(Event { t: 1.0, seq: 0, data: 1 });
        queue.push(Event { t: 1.0, seq: 1, data: 2 });
        let order: Vec<u8> = std::iter::from_fn(|| queue.pop().map(|e| e.data)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn noddy_run() {
        let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(NoddyAgent {})];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.0, 2)], agents);

        event_loop.run(10.0).unwrap();

        assert_eq!(event_loop.current_t(), 2.0);
        assert_eq!(event_loop.processed(), 2);
        assert_eq!(event_loop.pending(), 0);
    }

    #[test]
    fn dispatch_is_time_then_fifo_ordered() {
        let agents: Vec<Box<dyn Agent<u8, Vec<(f64, u8)>>>> =
            vec![Box::new(Recorder { seen: Vec::new() })];
        let events = vec![(0.5, 1), (0.2, 2), (0.5, 3), (0.2, 4), (0.0, 5)];
        let mut event_loop = EventLoop::new(events, agents);

        event_loop.run(1.0).unwrap();

        let stats = event_loop.stats();
        assert_eq!(
            stats[0],
            vec![(0.0, 5), (0.2, 2), (0.2, 4), (0.5, 1), (0.5, 3)]
        );
    }

    #[test]
    fn horizon_is_inclusive_and_later_events_stay_pending() {
        let agents: Vec<Box<dyn Agent<u8, Vec<(f64, u8)>>>> =
            vec![Box::new(Recorder { seen: Vec::new() })];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (1.5, 2), (2.0, 3)], agents);

        event_loop.run(1.5).unwrap();

        assert_eq!(event_loop.stats()[0], vec![(1.0, 1), (1.5, 2)]);
        assert_eq!(event_loop.current_t(), 1.5);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn self_rescheduling_agent_stops_at_horizon() {
        let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Ticker {
            interval: 0.25,
            ticks: 0,
        })];
        let mut event_loop = EventLoop::new(vec![(0.0, 0)], agents);

        event_loop.run(1.0).unwrap();

        // t = 0, 0.25, 0.5, 0.75, 1.0
        assert_eq!(event_loop.stats(), vec![5]);
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn zero_horizon_only_runs_time_zero_events() {
        let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Ticker {
            interval: 0.25,
            ticks: 0,
        })];
        let mut event_loop = EventLoop::new(vec![(0.0, 0)], agents);

        event_loop.run(0.0).unwrap();

        assert_eq!(event_loop.stats(), vec![1]);
    }

    #[test]
    fn scheduling_in_the_past_is_rejected() {
        struct Backwards;
        impl Agent<u8, ()> for Backwards {
            fn act(&mut self, current_t: f64, _data: &u8) -> Response<u8, ()> {
                Response::event(current_t - 1.0, 0)
            }
            fn stats(&self) {}
        }

        let agents: Vec<Box<dyn Agent<u8, ()>>> = vec![Box::new(Backwards)];
        let mut event_loop = EventLoop::new(vec![(2.0, 0)], agents);

        let err = event_loop.run(5.0).unwrap_err();
        assert_eq!(
            err,
            DesError::ScheduledInPast {
                scheduled: 1.0,
                now: 2.0
            }
        );
    }

    #[test]
    fn schedule_rejects_non_finite_times() {
        let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![];
        let mut event_loop = EventLoop::new(vec![], agents);

        assert!(matches!(
            event_loop.schedule(f64::NAN, 0),
            Err(DesError::NonFiniteTime(_))
        ));
        assert!(event_loop.schedule(f64::INFINITY, 0).is_err());
        assert!(event_loop.schedule(0.0, 0).is_ok());
        assert_eq!(event_loop.pending(), 1);
    }

    #[test]
    fn new_agent() {
        struct Spawner {}
        impl Agent<u8, usize> for Spawner {
            fn act(&mut self, _current_t: f64, _data: &u8) -> Response<u8, usize> {
                Response::agents(vec![Box::new(Spawner {})])
            }
            fn stats(&self) -> usize {
                1
            }
        }

        let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Spawner {})];
        let mut event_loop = EventLoop::new(vec![(1.0, 1), (2.0, 2)], agents);

        event_loop.run(10.0).unwrap();

        // First event: 1 new agent
        // Second event: 2 new agents
        assert_eq!(event_loop.agent_count(), 4);
        assert_eq!(event_loop.stats().iter().sum::<usize>(), 4);
    }
}
