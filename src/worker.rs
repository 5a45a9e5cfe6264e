//! The per-file task and its wire format.
//!
//! [`process_task`] is the unit of work under both execution models. For
//! isolated execution the parent serializes a [`WorkerRequest`] to JSON,
//! hands it to a child process, and reads back one JSON [`TaskOutcome`]
//! line from the child's stdout (see [`serve`]).

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::accountant::{CountStrategy, count_by_decoding, count_from_metadata};
use crate::codec::Codec;
use crate::config::{CountOptions, DEFAULT_PROGRESS_INTERVAL};
use crate::error::FrameCountError;
use crate::kind::{TranscodePlan, VideoKind};
use crate::manifest::ManifestRow;
use crate::progress::ProgressCallback;
use crate::transcode::transcode_and_count;

/// One file to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTask {
    /// Directory holding the source file.
    pub source_dir: PathBuf,
    /// Directory receiving converted outputs.
    pub output_dir: PathBuf,
    /// Bare filename of the source.
    pub filename: String,
}

impl WorkerTask {
    /// Full path of the source file.
    pub fn source_path(&self) -> PathBuf {
        self.source_dir.join(&self.filename)
    }
}

/// Per-run settings every task needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Counting strategy.
    pub strategy: CountStrategy,
    /// Conversion to apply to matching files.
    pub transcode: Option<TranscodePlan>,
    /// Frames between progress events.
    pub progress_interval: u64,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            strategy: CountStrategy::Decode,
            transcode: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl From<&CountOptions> for TaskSettings {
    fn from(options: &CountOptions) -> Self {
        Self {
            strategy: options.strategy,
            transcode: options.transcode,
            progress_interval: options.progress_interval,
        }
    }
}

/// What a finished task hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// The manifest row for this file.
    pub row: ManifestRow,
    /// Whether a converted output was written.
    pub transcoded: bool,
}

/// A task plus its settings, as sent to a child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// The file to process.
    pub task: WorkerTask,
    /// How to process it.
    pub settings: TaskSettings,
}

/// Count one file, converting it first when the plan applies.
///
/// # Errors
///
/// Open failures from the codec. A failed task produces no row.
pub fn process_task<C: Codec>(
    codec: &C,
    task: &WorkerTask,
    settings: &TaskSettings,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<TaskOutcome, FrameCountError> {
    let source_path = task.source_path();
    log::info!("Processing {}", source_path.display());

    let kind = VideoKind::from_filename(&task.filename);
    let plan = settings
        .transcode
        .filter(|plan| kind.is_some_and(|kind| plan.applies_to(kind)));

    let outcome = match (settings.strategy, plan) {
        (CountStrategy::Decode, Some(plan)) => {
            let converted = transcode_and_count(
                codec,
                &source_path,
                &task.output_dir,
                &plan,
                progress,
                settings.progress_interval,
            )?;
            TaskOutcome {
                row: ManifestRow::new(converted.output_name, converted.frames),
                transcoded: converted.transcoded,
            }
        }
        (CountStrategy::Decode, None) => TaskOutcome {
            row: ManifestRow::new(
                task.filename.clone(),
                count_by_decoding(codec, &source_path, progress, settings.progress_interval)?,
            ),
            transcoded: false,
        },
        (CountStrategy::Metadata, _) => TaskOutcome {
            row: ManifestRow::new(task.filename.clone(), count_from_metadata(codec, &source_path)?),
            transcoded: false,
        },
    };

    log::info!(
        "{} has {} frames",
        outcome.row.filename,
        outcome.row.framecount
    );
    Ok(outcome)
}

/// Handle one JSON request and return the JSON response line.
///
/// This is what the hidden `worker` subcommand of the binary runs.
///
/// # Errors
///
/// [`FrameCountError::WorkerProtocol`] for malformed requests, otherwise
/// whatever [`process_task`] returns.
pub fn serve<C: Codec>(
    codec: &C,
    request: &str,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<String, FrameCountError> {
    let request: WorkerRequest = serde_json::from_str(request)?;
    let outcome = process_task(codec, &request.task, &request.settings, progress)?;
    Ok(serde_json::to_string(&outcome)?)
}
