//! Isolated Call Pool Module
//!
//! Batch execution of in-process callables on a fixed pool of worker
//! threads, each call isolated behind its own log sink and panic
//! boundary.
//!
//! # Structure
//!
//! - [`call`]: call descriptors and per-call log sinks
//! - [`worker`]: worker threads and the isolation boundary
//! - [`coordinator`]: the pool and its wait-for-all collection

pub mod call;
pub mod coordinator;
pub mod worker;

pub use call::{CallError, CallFn, CallLog, FunctionCall};
pub use coordinator::CallPool;
