//! Error Types
//!
//! Every failure mode surfaced by the two executors. Validation problems
//! are raised at submission time or on entry to `run`, never mid-batch;
//! execution problems are always fatal to the whole batch.

use std::io;

use thiserror::Error;

/// Errors raised by the command queue and the call pool.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Malformed submission or out-of-range run parameter.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A child process could not be started.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Polling a running child failed.
    #[error("failed to poll '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A command stayed non-zero through its entire retry budget.
    ///
    /// Raised as soon as the exhausted command is detected; still-running
    /// sibling commands are abandoned, not awaited.
    #[error(
        "command '{command}' exited with code {code:?} after {attempts} attempt(s), \
         retry budget exhausted"
    )]
    RetryBudgetExhausted {
        command: String,
        code: Option<i32>,
        attempts: u32,
    },

    /// One or more pooled calls raised; reported only after every call
    /// in the batch has finished and surfaced its log.
    #[error("{failed} of {total} pooled call(s) raised an error")]
    AggregateCallFailure { failed: usize, total: usize },

    /// A pool worker went away before reporting a result.
    #[error("pool worker lost before reporting: {0}")]
    WorkerLost(String),
}

impl ExecError {
    /// Shorthand for a validation error with a formatted message.
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
