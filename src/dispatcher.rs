//! Bounded fan-out of per-file tasks.
//!
//! [`Dispatcher::run`] builds a dedicated rayon pool of `max_workers`
//! threads and runs one task per file on it, so at most that many tasks are
//! active at once. Under [`ExecutionModel::Processes`] each pool thread
//! spends its task waiting on a child process instead of decoding in
//! process, which isolates decoder crashes to the file that caused them.
//!
//! A failed task (open error, panic, child failure) is logged and counted;
//! it never stops the other tasks.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::aggregator::ResultAggregator;
use crate::codec::Codec;
use crate::config::CountOptions;
use crate::error::FrameCountError;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};
use crate::worker::{TaskOutcome, TaskSettings, WorkerRequest, WorkerTask, process_task};

/// How a child worker is launched.
///
/// The child receives `<args...> --request <json>` and must print one
/// JSON [`TaskOutcome`] line on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments placed before `--request`.
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Run `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Re-run the current executable's `worker` subcommand.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::IoError`] if the executable path is unavailable.
    pub fn current_exe() -> Result<Self, FrameCountError> {
        Ok(Self::new(std::env::current_exe()?).with_arg("worker"))
    }
}

/// Where tasks execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExecutionModel {
    /// In-process, one pool thread per active task.
    #[default]
    Threads,
    /// One child process per task, at most `max_workers` alive at a time.
    Processes(WorkerCommand),
}

/// Everything the dispatcher learned from a run.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Rows recorded by successful tasks.
    pub aggregator: ResultAggregator,
    /// Source filenames that produced a converted output.
    pub transcoded: Vec<String>,
    /// Source filenames whose task failed.
    pub failed: Vec<String>,
}

/// Runs tasks with bounded concurrency.
pub struct Dispatcher<'a, C: Codec> {
    codec: &'a C,
    max_workers: usize,
    execution: &'a ExecutionModel,
    settings: TaskSettings,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, C: Codec> Dispatcher<'a, C> {
    /// Create a dispatcher for the pool size, execution model, and task
    /// settings in `options`.
    pub fn new(codec: &'a C, options: &'a CountOptions) -> Self {
        Self {
            codec,
            max_workers: options.max_workers.max(1),
            execution: &options.execution,
            settings: TaskSettings::from(options),
            progress: Arc::clone(&options.progress),
        }
    }

    /// Run every task and block until all have finished.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::WorkerPool`] if the thread pool cannot be built.
    /// Per-task failures are reported in [`DispatchOutcome::failed`].
    pub fn run(&self, tasks: &[WorkerTask]) -> Result<DispatchOutcome, FrameCountError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|index| format!("framecount-worker-{index}"))
            .build()
            .map_err(|error| FrameCountError::WorkerPool(error.to_string()))?;

        log::info!(
            "Dispatching {} files to {} {}",
            tasks.len(),
            self.max_workers,
            match self.execution {
                ExecutionModel::Threads => "threads",
                ExecutionModel::Processes(_) => "worker processes",
            }
        );

        let aggregator = ResultAggregator::new();
        let transcoded = Mutex::new(Vec::new());
        let failed = Mutex::new(Vec::new());
        let tracker = Mutex::new(ProgressTracker::new(
            Arc::clone(&self.progress),
            OperationType::Dispatch,
            None,
            Some(tasks.len() as u64),
            1,
        ));

        pool.install(|| {
            tasks.par_iter().for_each(|task| {
                match self.run_task(task) {
                    Ok(outcome) => {
                        if outcome.transcoded {
                            lock(&transcoded).push(task.filename.clone());
                        }
                        aggregator.record(outcome.row);
                    }
                    Err(error) => {
                        log::error!("Skipping {}: {error}", task.filename);
                        lock(&failed).push(task.filename.clone());
                    }
                }
                lock(&tracker).advance();
            });
        });

        let outcome = DispatchOutcome {
            aggregator,
            transcoded: into_inner(transcoded),
            failed: into_inner(failed),
        };
        log::info!(
            "Dispatch finished: {} recorded, {} failed",
            outcome.aggregator.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    fn run_task(&self, task: &WorkerTask) -> Result<TaskOutcome, FrameCountError> {
        match self.execution {
            ExecutionModel::Threads => {
                catch_unwind(AssertUnwindSafe(|| {
                    process_task(self.codec, task, &self.settings, &self.progress)
                }))
                .unwrap_or_else(|payload| {
                    Err(FrameCountError::Worker {
                        filename: task.filename.clone(),
                        reason: format!("panicked: {}", panic_message(payload.as_ref())),
                    })
                })
            }
            ExecutionModel::Processes(command) => run_child(command, task, self.settings),
        }
    }
}

fn run_child(
    command: &WorkerCommand,
    task: &WorkerTask,
    settings: TaskSettings,
) -> Result<TaskOutcome, FrameCountError> {
    let worker_error = |reason: String| FrameCountError::Worker {
        filename: task.filename.clone(),
        reason,
    };

    let request = serde_json::to_string(&WorkerRequest {
        task: task.clone(),
        settings,
    })?;

    log::debug!(
        "Launching {} for {}",
        command.program.display(),
        task.filename
    );
    let output = Command::new(&command.program)
        .args(&command.args)
        .arg("--request")
        .arg(&request)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|error| {
            worker_error(format!(
                "failed to launch {}: {error}",
                command.program.display()
            ))
        })?;

    if !output.status.success() {
        return Err(worker_error(format!("worker exited with {}", output.status)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| worker_error("worker printed no result".to_string()))?;

    Ok(serde_json::from_str(line)?)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn into_inner<T>(mutex: Mutex<T>) -> T {
    mutex.into_inner().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
