//! Worker Pool Internals
//!
//! A fixed set of worker threads pulling jobs from a shared channel.
//! Each worker runs its call behind a panic boundary: neither a returned
//! error nor a panic reaches the coordinator as anything but an outcome
//! record with the error folded into the call's log.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::debug;

use super::call::{CallLog, CallOutcome, FunctionCall};

/// One dispatched call plus the channel its outcome goes back on.
pub(crate) struct Job {
    pub(crate) call: FunctionCall,
    pub(crate) result_tx: Sender<CallOutcome>,
}

/// Spawns `count` workers that drain `jobs` until the channel closes.
pub(crate) fn spawn_workers(
    count: usize,
    jobs: Arc<Mutex<Receiver<Job>>>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let jobs = Arc::clone(&jobs);
            thread::spawn(move || {
                debug!("Pool worker {} started", worker_id);
                worker_loop(jobs);
                debug!("Pool worker {} finished", worker_id);
            })
        })
        .collect()
}

fn worker_loop(jobs: Arc<Mutex<Receiver<Job>>>) {
    loop {
        // The lock is only held while picking up the next job
        let job = {
            let Ok(rx) = jobs.lock() else { break };
            rx.recv()
        };

        let Ok(job) = job else {
            // Channel closed - pool is shutting down
            break;
        };

        let outcome = run_call(job.call);
        // A closed result channel means the coordinator already bailed
        let _ = job.result_tx.send(outcome);
    }
}

/// Runs one call in isolation.
///
/// The call gets a private log sink; a returned error or a panic is
/// caught here, written into that sink, and reduced to a flag. The
/// original error never crosses back to the coordinator.
pub(crate) fn run_call(call: FunctionCall) -> CallOutcome {
    let (label, job) = call.into_parts();
    let mut sink = CallLog::new();

    let errored = match panic::catch_unwind(AssertUnwindSafe(|| job(&mut sink))) {
        Ok(Ok(())) => false,
        Ok(Err(err)) => {
            sink.append(format!("call raised an error: {}", err));
            true
        }
        Err(payload) => {
            sink.append(format!("call panicked: {}", panic_message(payload.as_ref())));
            true
        }
    };

    CallOutcome {
        label,
        log: sink.into_text(),
        errored,
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "opaque panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_run_call_success() {
        let call = FunctionCall::new(|log: &mut CallLog| {
            log.append("processed 42 records");
            Ok(())
        });

        let outcome = run_call(call);

        assert!(!outcome.errored);
        assert_eq!(outcome.log, "processed 42 records");
    }

    #[test]
    fn test_run_call_error_is_caught_and_logged() {
        let call = FunctionCall::new(|_log: &mut CallLog| Err("reference index missing".into()))
            .with_label("align");

        let outcome = run_call(call);

        assert!(outcome.errored);
        assert_eq!(outcome.label.as_deref(), Some("align"));
        assert!(outcome.log.contains("reference index missing"));
    }

    #[test]
    fn test_run_call_panic_is_caught() {
        let call = FunctionCall::new(|_log: &mut CallLog| panic!("index out of range"));

        let outcome = run_call(call);

        assert!(outcome.errored);
        assert!(outcome.log.contains("index out of range"));
    }

    #[test]
    fn test_run_call_formatted_panic_message_is_kept() {
        // A formatted panic carries a String payload rather than a &str;
        // both must survive into the call's log verbatim.
        let chunk = 7;
        let call = FunctionCall::new(move |_log: &mut CallLog| panic!("chunk {} corrupt", chunk));

        let outcome = run_call(call);

        assert!(outcome.errored);
        assert!(outcome.log.contains("chunk 7 corrupt"));
    }

    #[test]
    fn test_run_call_keeps_log_written_before_error() {
        let call = FunctionCall::new(|log: &mut CallLog| {
            log.append("step one done");
            Err("step two failed".into())
        });

        let outcome = run_call(call);

        assert!(outcome.errored);
        assert!(outcome.log.contains("step one done"));
        assert!(outcome.log.contains("step two failed"));
    }

    #[test]
    fn test_workers_drain_channel_and_exit() {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let workers = spawn_workers(2, Arc::new(Mutex::new(job_rx)));

        let mut results = Vec::new();
        for i in 0..4 {
            let (result_tx, result_rx) = mpsc::channel();
            let call = FunctionCall::new(move |log: &mut CallLog| {
                log.append(format!("job {}", i));
                Ok(())
            });
            job_tx.send(Job { call, result_tx }).unwrap();
            results.push(result_rx);
        }
        drop(job_tx);

        for rx in results {
            let outcome = rx.recv().unwrap();
            assert!(!outcome.errored);
        }

        for handle in workers {
            handle.join().unwrap();
        }
    }
}
