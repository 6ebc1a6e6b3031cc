//! Parallel execution of independent EventLoop scenarios
//!
//! Each scenario is built from its `scenario_id` (typically used to derive a
//! seed), run to a common horizon on a rayon pool, and its agent stats
//! returned in scenario order.
//!
//! # Example
//!
//! ```rust
//! use des::parallel::{ParallelRunner, simple_progress_reporter};
//! # use des::{Agent, EventLoop};
//! # struct TestAgent;
//! # impl Agent<u8, usize> for TestAgent {
//! #     fn stats(&self) -> usize { 1 }
//! # }
//!
//! let results = ParallelRunner::new(20, |_scenario_id| {
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(TestAgent)];
//!     Ok::<_, String>(EventLoop::new(vec![(0.0, 1)], agents))
//! })
//! .progress(simple_progress_reporter(10))
//! .num_threads(2)
//! .run(100.0);
//!
//! assert_eq!(results.len(), 20);
//! assert!(results.iter().all(|r| r.is_ok()));
//! ```
//!
//! # Error Handling
//!
//! A scenario fails independently of the others when its builder returns an
//! error, when its event loop rejects an event, or when it panics. All three
//! surface as `Err(String)` in that scenario's slot.

use crate::EventLoop;
use rayon::prelude::*;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Executes multiple EventLoop scenarios in parallel
///
/// The builder `F` is called once per scenario with its id and must be
/// `Send + Sync` because it is shared across worker threads.
pub struct ParallelRunner<T, S, E, F>
where
    F: Fn(usize) -> Result<EventLoop<T, S>, E> + Send + Sync,
    E: Display,
    S: Send,
{
    num_scenarios: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
    _marker: PhantomData<fn() -> (T, S, E)>,
}

impl<T, S, E, F> ParallelRunner<T, S, E, F>
where
    F: Fn(usize) -> Result<EventLoop<T, S>, E> + Send + Sync,
    E: Display,
    S: Send,
{
    pub fn new(num_scenarios: usize, builder: F) -> Self {
        ParallelRunner {
            num_scenarios,
            builder,
            num_threads: None,
            progress_callback: None,
            _marker: PhantomData,
        }
    }

    /// Set number of threads (defaults to rayon's global pool)
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Set progress callback, called with `(completed, total)` after each scenario
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    fn run_one(&self, scenario_id: usize, run_until: f64) -> Result<Vec<S>, String> {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
            || -> Result<Vec<S>, String> {
                let mut event_loop = (self.builder)(scenario_id).map_err(|e| e.to_string())?;
                event_loop.run(run_until).map_err(|e| e.to_string())?;
                Ok(event_loop.stats())
            },
        ));

        match outcome {
            Ok(result) => result,
            Err(panic) => Err(if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }),
        }
    }

    /// Execute all scenarios and return results in scenario_id order
    pub fn run(self, run_until: f64) -> Vec<Result<Vec<S>, String>> {
        let progress_counter = AtomicUsize::new(0);

        let execute = || {
            (0..self.num_scenarios)
                .into_par_iter()
                .map(|scenario_id| {
                    let result = self.run_one(scenario_id, run_until);

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.num_scenarios);
                    }
                    result
                })
                .collect()
        };

        // Fall back to the global pool if a dedicated one cannot be built.
        let pool = self
            .num_threads
            .and_then(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build().ok());

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

/// Run scenarios in parallel on the global rayon pool
pub fn run_parallel<T, S, E, F>(
    num_scenarios: usize,
    builder: F,
    run_until: f64,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> Result<EventLoop<T, S>, E> + Send + Sync,
    E: Display,
    S: Send,
{
    ParallelRunner::new(num_scenarios, builder).run(run_until)
}

/// Progress callback that logs every `interval` completed scenarios
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            info!(completed, total, "scenarios completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Agent, Response};

    struct CounterAgent {
        id: usize,
        count: usize,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct CounterStats {
        id: usize,
        count: usize,
    }

    impl Agent<u8, CounterStats> for CounterAgent {
        fn act(&mut self, current_t: f64, _data: &u8) -> Response<u8, CounterStats> {
            self.count += 1;
            Response::event(current_t + 1.0, 0)
        }

        fn stats(&self) -> CounterStats {
            CounterStats {
                id: self.id,
                count: self.count,
            }
        }
    }

    fn counter_loop(scenario_id: usize) -> Result<EventLoop<u8, CounterStats>, String> {
        let agents: Vec<Box<dyn Agent<u8, CounterStats>>> = vec![Box::new(CounterAgent {
            id: scenario_id,
            count: 0,
        })];
        Ok(EventLoop::new(vec![(0.0, 1)], agents))
    }

    #[test]
    fn test_parallel_basic() {
        let results = run_parallel(10, counter_loop, 9.0);

        assert_eq!(results.len(), 10);
        for (i, result) in results.iter().enumerate() {
            let stats = result.as_ref().unwrap();
            assert_eq!(stats[0].id, i);
            // t = 0..=9
            assert_eq!(stats[0].count, 10);
        }
    }

    #[test]
    fn test_parallel_determinism() {
        let run1 = run_parallel(20, counter_loop, 50.0);
        let run2 = run_parallel(20, counter_loop, 50.0);

        assert_eq!(run1, run2);
    }

    #[test]
    fn test_parallel_panic_isolation() {
        let results = run_parallel(
            10,
            |scenario_id| {
                if scenario_id == 5 {
                    panic!("Test panic");
                }
                counter_loop(scenario_id)
            },
            10.0,
        );

        assert_eq!(results.len(), 10);
        assert_eq!(results[5], Err("Test panic".to_string()));
        for (i, result) in results.iter().enumerate() {
            if i != 5 {
                assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn test_builder_error_is_reported_per_scenario() {
        let results = run_parallel(
            4,
            |scenario_id| {
                if scenario_id == 2 {
                    return Err("bad configuration".to_string());
                }
                counter_loop(scenario_id)
            },
            1.0,
        );

        assert_eq!(results[2], Err("bad configuration".to_string()));
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    }

    #[test]
    fn test_parallel_progress_callback() {
        use std::sync::Mutex;
        let completed = Arc::new(Mutex::new(0));
        let completed_clone = completed.clone();

        ParallelRunner::new(5, counter_loop)
            .progress(move |count, _total| {
                let mut latest = completed_clone.lock().unwrap();
                *latest = (*latest).max(count);
            })
            .run(1.0);

        assert_eq!(*completed.lock().unwrap(), 5);
    }

    #[test]
    fn test_parallel_custom_threads() {
        let results = ParallelRunner::new(8, counter_loop).num_threads(2).run(1.0);

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn test_empty_scenarios() {
        let results = run_parallel(0, counter_loop, 100.0);

        assert_eq!(results.len(), 0);
    }

    #[test]
    fn test_simple_progress_reporter() {
        let reporter = simple_progress_reporter(10);
        reporter(10, 100);
        reporter(100, 100);
    }
}
