//! Batch Reporting
//!
//! Per-run event record for command batches: what was launched, retried,
//! completed or failed, and how long the batch took. Owned by the
//! scheduler for the duration of one run.

use std::time::{Duration, Instant};

/// Type of batch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A command's child process was started.
    Launched,
    /// A command exited zero.
    Completed,
    /// A command exited non-zero and was requeued.
    Retried,
    /// A command exhausted its retry budget.
    Failed,
}

/// A single recorded event.
#[derive(Debug, Clone)]
pub struct BatchEvent {
    /// Display form of the command.
    pub command: String,
    /// What happened.
    pub kind: EventKind,
    /// When it happened.
    pub timestamp: Instant,
}

/// Records the events of one batch run.
#[derive(Debug)]
pub struct BatchReport {
    events: Vec<BatchEvent>,
    started: Instant,
}

impl BatchReport {
    /// Creates a report starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Records an event for a command.
    pub fn record(&mut self, command: String, kind: EventKind) {
        self.events.push(BatchEvent {
            command,
            kind,
            timestamp: Instant::now(),
        });
    }

    /// All recorded events, in order.
    pub fn events(&self) -> &[BatchEvent] {
        &self.events
    }

    /// Number of events of one kind.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Elapsed wall time since the report was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One-line summary for the end-of-batch log.
    pub fn summary(&self) -> String {
        format!(
            "Batch finished: {} completed, {} retried, {} failed in {:.2?}",
            self.count(EventKind::Completed),
            self.count(EventKind::Retried),
            self.count(EventKind::Failed),
            self.elapsed()
        )
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_starts_empty() {
        let report = BatchReport::new();
        assert!(report.events().is_empty());
        assert_eq!(report.count(EventKind::Completed), 0);
    }

    #[test]
    fn test_record_and_count() {
        let mut report = BatchReport::new();
        report.record("echo a".to_string(), EventKind::Launched);
        report.record("echo a".to_string(), EventKind::Retried);
        report.record("echo a".to_string(), EventKind::Launched);
        report.record("echo a".to_string(), EventKind::Completed);

        assert_eq!(report.events().len(), 4);
        assert_eq!(report.count(EventKind::Launched), 2);
        assert_eq!(report.count(EventKind::Retried), 1);
        assert_eq!(report.count(EventKind::Completed), 1);
        assert_eq!(report.count(EventKind::Failed), 0);
    }

    #[test]
    fn test_summary_contains_counts() {
        let mut report = BatchReport::new();
        report.record("fastqc s1.fastq".to_string(), EventKind::Completed);
        report.record("fastqc s2.fastq".to_string(), EventKind::Completed);
        report.record("fastqc s3.fastq".to_string(), EventKind::Failed);

        let summary = report.summary();
        assert!(summary.contains("2 completed"));
        assert!(summary.contains("1 failed"));
    }

    #[test]
    fn test_events_keep_order() {
        let mut report = BatchReport::new();
        report.record("a".to_string(), EventKind::Launched);
        report.record("b".to_string(), EventKind::Launched);

        let events = report.events();
        assert_eq!(events[0].command, "a");
        assert_eq!(events[1].command, "b");
        assert!(events[0].timestamp <= events[1].timestamp);
    }
}
