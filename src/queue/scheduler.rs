//! Command Scheduling
//!
//! The cooperative polling scheduler that runs a batch of external
//! commands with a concurrency cap and a per-command retry budget.
//!
//! The coordinating loop is single-threaded: running children are swept
//! with non-blocking waits so newly finished and still-running commands
//! can be told apart without dedicating a controller thread to each
//! child. Only the pipe readers run on their own threads, so the sweep
//! never blocks on a full pipe buffer.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};

use crate::error::ExecError;
use crate::report::{BatchReport, EventKind};
use crate::{check_concurrency, MAX_RETRIES};

use super::command::CommandSpec;

/// Sleep between poll sweeps that detected no completions.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for one batch run.
///
/// Defaults: argv execution (no shell), output captured, no retries.
///
/// # Example
///
/// ```
/// use batchpool::queue::RunOptions;
///
/// let opts = RunOptions::new(8).with_retries(2);
/// ```
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub(crate) concurrency: usize,
    pub(crate) shell: bool,
    pub(crate) capture_output: bool,
    pub(crate) retries: u32,
}

impl RunOptions {
    /// Creates options with the given concurrency cap and defaults for
    /// everything else.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            shell: false,
            capture_output: true,
            retries: 0,
        }
    }

    /// Runs each command through the platform shell instead of argv.
    ///
    /// The argument list is joined into a single line and handed to the
    /// shell, which gives up argument isolation in exchange for shell
    /// features. Off by default; callers must opt in explicitly.
    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Captures merged stdout/stderr per attempt (default), or discards
    /// both streams entirely.
    pub fn with_capture_output(mut self, capture_output: bool) -> Self {
        self.capture_output = capture_output;
        self
    }

    /// Sets the relaunch budget per failing command (0 to 30).
    ///
    /// A command is allowed `retries + 1` total attempts; the last
    /// attempt is its last chance.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Lifecycle of one command within a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemState {
    /// Waiting for a free slot, not yet attempted.
    Pending,
    /// Child process is live.
    Running,
    /// Exited zero.
    Succeeded,
    /// Exited non-zero with budget left; waiting to be relaunched.
    FailedRetry,
    /// Exited non-zero with the budget spent.
    FailedFatal,
}

/// Scheduler-owned bookkeeping for one command across its attempts.
#[derive(Debug)]
struct WorkItem {
    spec: CommandSpec,
    retries_used: u32,
    state: ItemState,
}

impl WorkItem {
    fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            retries_used: 0,
            state: ItemState::Pending,
        }
    }
}

/// A work item occupying a slot: its live child process plus the reader
/// threads draining the child's pipes.
struct RunningItem {
    item: WorkItem,
    child: Child,
    capture: Option<CaptureHandles>,
}

/// Reader threads for one child's stdout and stderr.
struct CaptureHandles {
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl CaptureHandles {
    /// Joins the readers and merges what they collected, stdout first.
    fn collect(self) -> Vec<u8> {
        let mut merged = Vec::new();
        for handle in [self.stdout, self.stderr].into_iter().flatten() {
            merged.extend(handle.join().unwrap_or_default());
        }
        merged
    }
}

/// A queue of external commands executed as concurrent child processes.
///
/// Commands are validated when added and drained when run; the queue is
/// single-use per batch and ready for fresh submissions after `run`
/// returns, whatever the outcome.
///
/// # Example
///
/// ```no_run
/// use batchpool::queue::{CommandQueue, RunOptions};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut queue = CommandQueue::new();
///     queue.add_command(vec!["fastqc".into(), "sample1.fastq".into()])?;
///     queue.add_command(vec!["fastqc".into(), "sample2.fastq".into()])?;
///
///     queue.run_with(RunOptions::new(4).with_retries(2))?;
///     Ok(())
/// }
/// ```
pub struct CommandQueue {
    pending: Vec<CommandSpec>,
}

impl CommandQueue {
    /// Creates an empty command queue.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Validates and appends one command.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Validation`] for an empty argument list or a
    /// blank program name; the queue is left unchanged.
    pub fn add_command(&mut self, argv: Vec<String>) -> Result<(), ExecError> {
        self.pending.push(CommandSpec::new(argv)?);
        Ok(())
    }

    /// Validates and appends a list of commands.
    ///
    /// Stops at the first invalid entry; entries before it stay queued.
    pub fn add_commands(&mut self, commands: Vec<Vec<String>>) -> Result<(), ExecError> {
        for argv in commands {
            self.add_command(argv)?;
        }
        Ok(())
    }

    /// Appends an already-validated command.
    pub fn add_spec(&mut self, spec: CommandSpec) {
        self.pending.push(spec);
    }

    /// Number of commands waiting for the next run.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no commands are queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Runs the batch with default options (argv mode, output captured,
    /// no retries).
    pub fn run(&mut self, concurrency: usize) -> Result<(), ExecError> {
        self.run_with(RunOptions::new(concurrency))
    }

    /// Runs the full batch, blocking until every command has succeeded
    /// or a fatal error aborts the run.
    ///
    /// Pending commands are launched as child processes, at most
    /// `concurrency` at a time. A command exiting non-zero is relaunched
    /// while its retry budget lasts; once a command exhausts its budget
    /// the whole batch fails immediately and still-running siblings are
    /// abandoned rather than awaited or terminated.
    ///
    /// The queue is drained once parameter validation passes, regardless
    /// of the run's outcome.
    ///
    /// # Errors
    ///
    /// * [`ExecError::Validation`] - concurrency outside 1..=36 or
    ///   retries above 30; raised before any command is launched or the
    ///   queue is drained.
    /// * [`ExecError::Spawn`] - a child process could not be started.
    /// * [`ExecError::RetryBudgetExhausted`] - a command stayed non-zero
    ///   through all permitted attempts.
    pub fn run_with(&mut self, opts: RunOptions) -> Result<(), ExecError> {
        check_concurrency(opts.concurrency)?;
        if opts.retries > MAX_RETRIES {
            return Err(ExecError::validation(format!(
                "retries must be between 0 and {}, was {}",
                MAX_RETRIES, opts.retries
            )));
        }

        let mut to_run: Vec<WorkItem> = self.pending.drain(..).map(WorkItem::new).collect();

        if to_run.is_empty() {
            debug!("Command batch is empty - nothing to run");
            return Ok(());
        }

        info!(
            "Running {} command(s) (concurrency: {}, retries: {}, shell: {})",
            to_run.len(),
            opts.concurrency,
            opts.retries,
            opts.shell
        );

        let mut report = BatchReport::new();
        let mut running: Vec<RunningItem> = Vec::new();

        while !to_run.is_empty() || !running.is_empty() {
            // Fill free slots greedily
            while running.len() < opts.concurrency {
                let Some(item) = to_run.pop() else { break };
                let launched = launch(item, &opts)?;
                report.record(launched.item.spec.to_string(), EventKind::Launched);
                running.push(launched);
            }

            // Sweep running children with non-blocking waits
            let mut progressed = false;
            for mut entry in std::mem::take(&mut running) {
                let status = entry.child.try_wait().map_err(|source| ExecError::Wait {
                    command: entry.item.spec.to_string(),
                    source,
                })?;

                let Some(status) = status else {
                    running.push(entry);
                    continue;
                };
                progressed = true;

                let RunningItem {
                    mut item,
                    child,
                    capture,
                } = entry;
                // Exit status already reaped; releasing the handle frees the slot
                drop(child);

                let output = capture.map(CaptureHandles::collect).unwrap_or_default();

                if status.success() {
                    item.state = ItemState::Succeeded;
                    report.record(item.spec.to_string(), EventKind::Completed);
                    log_completion(&item.spec, &output);
                } else if item.retries_used == opts.retries {
                    item.state = ItemState::FailedFatal;
                    report.record(item.spec.to_string(), EventKind::Failed);

                    let text = output_text(&output);
                    if !text.is_empty() {
                        info!("Command '{}' exited with errors:\n{}", item.spec, text);
                    }

                    return Err(ExecError::RetryBudgetExhausted {
                        command: item.spec.to_string(),
                        code: status.code(),
                        attempts: item.retries_used + 1,
                    });
                } else {
                    item.retries_used += 1;
                    item.state = ItemState::FailedRetry;
                    report.record(item.spec.to_string(), EventKind::Retried);
                    debug!(
                        "Command '{}' exited with code {:?} - retry {}/{}",
                        item.spec,
                        status.code(),
                        item.retries_used,
                        opts.retries
                    );
                    to_run.push(item);
                }
            }

            // Nothing finished this sweep; yield before polling again
            if !progressed && !running.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }

        info!("{}", report.summary());
        Ok(())
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the child process for a pending or retried item.
fn launch(mut item: WorkItem, opts: &RunOptions) -> Result<RunningItem, ExecError> {
    let mut cmd = if opts.shell {
        let line = item.spec.shell_line();
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(line);
            c
        }
    } else {
        let mut c = Command::new(item.spec.program());
        c.args(item.spec.args());
        c
    };

    if opts.capture_output {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: item.spec.to_string(),
        source,
    })?;

    let capture = if opts.capture_output {
        Some(CaptureHandles {
            stdout: child.stdout.take().map(spawn_reader),
            stderr: child.stderr.take().map(spawn_reader),
        })
    } else {
        None
    };

    let verb = match item.state {
        ItemState::FailedRetry => "Relaunched",
        _ => "Launched",
    };
    debug!("{} '{}' (pid: {})", verb, item.spec, child.id());

    item.state = ItemState::Running;
    Ok(RunningItem {
        item,
        child,
        capture,
    })
}

/// Drains one pipe to completion on its own thread.
///
/// A read error ends the drain early; whatever was collected up to that
/// point is kept, with a debug line noting the truncation.
fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf) {
            debug!("Pipe read failed, captured output may be truncated: {}", e);
        }
        buf
    })
}

/// Captured bytes as trimmed text, lossy on invalid UTF-8.
fn output_text(output: &[u8]) -> String {
    String::from_utf8_lossy(output).trim().to_string()
}

/// Logs the one-line completion summary for a successful command.
fn log_completion(spec: &CommandSpec, output: &[u8]) {
    let text = output_text(output);
    if text.is_empty() {
        info!("Command '{}' completed", spec);
    } else {
        info!("Command '{}' completed:\n{}", spec, text);
    }
}
