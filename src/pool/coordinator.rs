//! Call Pool Coordination
//!
//! Dispatches queued calls to a fixed worker pool and collects every
//! outcome before reporting failure. Unlike the command scheduler, a
//! failing call never aborts the batch early: every call gets to finish
//! and surface its captured log before the single aggregate error is
//! raised.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::check_concurrency;
use crate::error::ExecError;

use super::call::{CallError, CallLog, CallOutcome, FunctionCall};
use super::worker::{spawn_workers, Job};

/// A queue of in-process callables executed in isolation on a fixed pool
/// of worker threads.
///
/// Calls are drained when run; the pool is single-use per batch and
/// ready for fresh submissions afterwards.
///
/// # Example
///
/// ```
/// use batchpool::pool::{CallLog, CallPool};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut pool = CallPool::new();
///     for sample in ["s1", "s2", "s3"] {
///         let sample = sample.to_string();
///         pool.add_call(move |log: &mut CallLog| {
///             log.append(format!("processed {}", sample));
///             Ok(())
///         });
///     }
///
///     pool.run(2)?;
///     Ok(())
/// }
/// ```
pub struct CallPool {
    calls: Vec<FunctionCall>,
}

impl CallPool {
    /// Creates an empty call pool.
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    /// Queues a callable for the next run.
    pub fn add_call<F>(&mut self, job: F)
    where
        F: FnOnce(&mut CallLog) -> Result<(), CallError> + Send + 'static,
    {
        self.calls.push(FunctionCall::new(job));
    }

    /// Queues a prepared descriptor, keeping its label.
    pub fn add(&mut self, call: FunctionCall) {
        self.calls.push(call);
    }

    /// Number of calls waiting for the next run.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns true if no calls are queued.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Runs every queued call on `concurrency` workers and blocks until
    /// all of them have reported.
    ///
    /// Outcomes are awaited in dispatch order, one blocking wait at a
    /// time. An error in one call never cuts the others short: failure
    /// is reported once, after the whole batch has finished and every
    /// non-empty call log has been written to the logging stream.
    ///
    /// # Errors
    ///
    /// * [`ExecError::Validation`] - concurrency outside 1..=36; raised
    ///   before any call is dispatched or the queue is drained.
    /// * [`ExecError::AggregateCallFailure`] - at least one call raised.
    /// * [`ExecError::WorkerLost`] - a worker vanished without reporting.
    pub fn run(&mut self, concurrency: usize) -> Result<(), ExecError> {
        check_concurrency(concurrency)?;

        let calls: Vec<FunctionCall> = self.calls.drain(..).collect();
        let total = calls.len();

        if total == 0 {
            debug!("Call batch is empty - nothing to run");
            return Ok(());
        }

        info!("Dispatching {} call(s) to {} worker(s)", total, concurrency);

        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let workers = spawn_workers(concurrency, Arc::new(Mutex::new(job_rx)));

        // Dispatch everything up front; workers pull jobs as they free up
        let mut pending = Vec::with_capacity(total);
        let mut dispatch_failed = false;
        for call in calls {
            let (result_tx, result_rx) = mpsc::channel::<CallOutcome>();
            if job_tx.send(Job { call, result_tx }).is_err() {
                dispatch_failed = true;
                break;
            }
            pending.push(result_rx);
        }
        // Closing the job channel lets workers exit once the queue drains
        drop(job_tx);

        // Wait-for-all barrier, in dispatch order
        let mut outcomes = Vec::with_capacity(total);
        let mut lost = None;
        for (index, result_rx) in pending.into_iter().enumerate() {
            match result_rx.recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(_) => {
                    lost = Some(index);
                    break;
                }
            }
        }

        // Release the pool on every path
        for handle in workers {
            let _ = handle.join();
        }

        if dispatch_failed {
            return Err(ExecError::WorkerLost(
                "job channel closed before dispatch finished".to_string(),
            ));
        }
        if let Some(index) = lost {
            return Err(ExecError::WorkerLost(format!(
                "no outcome reported for call #{}",
                index
            )));
        }

        let mut failed = 0;
        for outcome in &outcomes {
            if !outcome.log.is_empty() {
                match &outcome.label {
                    Some(label) => info!("Call '{}' completed:\n{}", label, outcome.log),
                    None => info!("Pooled call completed:\n{}", outcome.log),
                }
            }
            if outcome.errored {
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(ExecError::AggregateCallFailure { failed, total });
        }

        Ok(())
    }
}

impl Default for CallPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_concurrency_bounds_rejected_before_drain() {
        let mut pool = CallPool::new();
        pool.add_call(|_log| Ok(()));

        assert!(matches!(pool.run(0), Err(ExecError::Validation(_))));
        assert!(matches!(pool.run(37), Err(ExecError::Validation(_))));
        // Validation failure happens before the calls are drained
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_empty_pool_succeeds() {
        let mut pool = CallPool::new();
        assert!(pool.run(4).is_ok());
    }

    #[test]
    fn test_all_calls_execute() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = CallPool::new();

        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.add_call(move |_log| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert!(pool.run(3).is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_single_error_fails_batch() {
        let mut pool = CallPool::new();
        pool.add_call(|_log| Ok(()));
        pool.add_call(|_log| Err("bad barcode".into()));
        pool.add_call(|_log| Ok(()));

        match pool.run(2) {
            Err(ExecError::AggregateCallFailure { failed, total }) => {
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected aggregate failure, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_panicking_call_fails_batch_without_poisoning_it() {
        let mut pool = CallPool::new();
        pool.add_call(|_log| panic!("corrupt chunk"));

        assert!(matches!(
            pool.run(1),
            Err(ExecError::AggregateCallFailure { failed: 1, total: 1 })
        ));

        // The pool itself is reusable afterwards
        pool.add_call(|_log| Ok(()));
        assert!(pool.run(1).is_ok());
    }

    #[test]
    fn test_error_does_not_short_circuit_slow_call() {
        // Slow call A is dispatched before fast failing call B; the run
        // must still collect A's result before reporting B's error.
        let slow_finished = Arc::new(AtomicUsize::new(0));
        let mut pool = CallPool::new();

        let finished = Arc::clone(&slow_finished);
        pool.add_call(move |log| {
            thread::sleep(Duration::from_millis(300));
            finished.fetch_add(1, Ordering::SeqCst);
            log.append("slow call done");
            Ok(())
        });
        pool.add_call(|_log| Err("fast failure".into()));

        let result = pool.run(2);

        assert!(matches!(
            result,
            Err(ExecError::AggregateCallFailure { failed: 1, total: 2 })
        ));
        assert_eq!(
            slow_finished.load(Ordering::SeqCst),
            1,
            "slow call must complete before the batch error is raised"
        );
    }

    #[test]
    fn test_all_errors_counted() {
        let mut pool = CallPool::new();
        for _ in 0..4 {
            pool.add_call(|_log| Err("boom".into()));
        }

        match pool.run(4) {
            Err(ExecError::AggregateCallFailure { failed, total }) => {
                assert_eq!(failed, 4);
                assert_eq!(total, 4);
            }
            other => panic!("expected aggregate failure, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_fresh_batch_after_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = CallPool::new();

        let c = Arc::clone(&counter);
        pool.add_call(move |_log| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(pool.run(1).is_ok());

        let c = Arc::clone(&counter);
        pool.add_call(move |_log| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(pool.run(1).is_ok());

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_labelled_call_runs() {
        let mut pool = CallPool::new();
        pool.add(
            FunctionCall::new(|log: &mut CallLog| {
                log.append("demultiplexed lane 1");
                Ok(())
            })
            .with_label("demux-l1"),
        );

        assert!(pool.run(1).is_ok());
    }
}
