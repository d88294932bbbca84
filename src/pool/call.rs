//! Call Descriptors and Log Sinks
//!
//! In-process callables queued for isolated execution, plus the private
//! log sink each callable writes through instead of the shared process
//! logger. The sink's text travels back to the coordinator with the
//! call's outcome, so output from concurrent calls never interleaves.

use std::error::Error;
use std::fmt;

/// Boxed error type a pooled call may return.
pub type CallError = Box<dyn Error + Send + Sync>;

/// The job signature: a one-shot callable handed its private log sink.
pub type CallFn = Box<dyn FnOnce(&mut CallLog) -> Result<(), CallError> + Send + 'static>;

/// An in-memory log sink private to one pooled call.
///
/// # Example
///
/// ```
/// use batchpool::pool::CallLog;
///
/// let mut log = CallLog::new();
/// log.append("aligned 12000 reads");
/// assert!(!log.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct CallLog {
    lines: Vec<String>,
}

impl CallLog {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Appends one line of output.
    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines written so far.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Consumes the sink and joins its lines into the outcome text.
    pub(crate) fn into_text(self) -> String {
        self.lines.join("\n")
    }
}

/// One queued callable, with an optional label used in progress lines.
///
/// The compiler enforces the callable's signature, so unlike command
/// submission there is nothing left to validate when a call is added.
pub struct FunctionCall {
    label: Option<String>,
    job: CallFn,
}

impl FunctionCall {
    /// Wraps a callable for dispatch.
    pub fn new<F>(job: F) -> Self
    where
        F: FnOnce(&mut CallLog) -> Result<(), CallError> + Send + 'static,
    {
        Self {
            label: None,
            job: Box::new(job),
        }
    }

    /// Names the call in progress log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The call's label, if one was set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Option<String>, CallFn) {
        (self.label, self.job)
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCall")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// What a worker reports back for every call, error or not.
#[derive(Debug)]
pub(crate) struct CallOutcome {
    pub(crate) label: Option<String>,
    pub(crate) log: String,
    pub(crate) errored: bool,
}
