//! batchpool - Bounded-Concurrency Batch Executor
//!
//! Runs one batch of independent work items with a concurrency cap and
//! reports a single pass/fail outcome. Built for genomics pipelines that
//! fan the same tool out over many samples, but agnostic to what the
//! commands actually do.
//!
//! Two sibling executors share the same contract shape and differ in
//! isolation model:
//!
//! - [`queue::CommandQueue`]: external commands as child processes, with
//!   cooperative polling, per-command retries, and fail-fast on the first
//!   exhausted retry budget.
//! - [`pool::CallPool`]: in-process callables on a fixed worker pool,
//!   each isolated behind a private log sink and panic boundary, with
//!   failure reported only after every call has finished.
//!
//! # Architecture
//!
//! - [`queue`]: command queue and scheduler
//! - [`pool`]: isolated call pool
//! - [`batch`]: YAML batch file loading for the CLI
//! - [`report`]: per-run event record and summary
//! - [`error`]: failure kinds
//!
//! # Example
//!
//! ```no_run
//! use batchpool::queue::{CommandQueue, RunOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut queue = CommandQueue::new();
//!     queue.add_command(vec!["fastqc".into(), "sample1.fastq".into()])?;
//!     queue.add_command(vec!["fastqc".into(), "sample2.fastq".into()])?;
//!
//!     queue.run_with(RunOptions::new(4).with_retries(2))?;
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod error;
pub mod pool;
pub mod queue;
pub mod report;

// Re-export commonly used types
pub use batch::{load_batch, BatchFile};
pub use error::ExecError;
pub use pool::{CallLog, CallPool, FunctionCall};
pub use queue::{CommandQueue, CommandSpec, RunOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "batchpool";

/// Hard cap on concurrent work items, shared by both executors.
pub const MAX_CONCURRENCY: usize = 36;

/// Hard cap on the per-command retry budget.
pub const MAX_RETRIES: u32 = 30;

/// Validates a concurrency value against the shared bounds.
pub(crate) fn check_concurrency(concurrency: usize) -> Result<(), ExecError> {
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(ExecError::validation(format!(
            "concurrency must be between 1 and {}, was {}",
            MAX_CONCURRENCY, concurrency
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "batchpool");
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(check_concurrency(0).is_err());
        assert!(check_concurrency(1).is_ok());
        assert!(check_concurrency(MAX_CONCURRENCY).is_ok());
        assert!(check_concurrency(MAX_CONCURRENCY + 1).is_err());
    }

    #[test]
    fn test_module_exports() {
        let queue = CommandQueue::new();
        assert!(queue.is_empty());

        let pool = CallPool::new();
        assert!(pool.is_empty());
    }
}
