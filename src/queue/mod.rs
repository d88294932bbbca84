//! Command Queue Module
//!
//! Batch execution of external commands as concurrent child processes,
//! with a concurrency cap and a per-command retry budget.
//!
//! # Structure
//!
//! - [`command`]: validated command descriptors
//! - [`scheduler`]: the queue and its cooperative polling scheduler

pub mod command;
pub mod scheduler;

pub use command::CommandSpec;
pub use scheduler::{CommandQueue, RunOptions};
