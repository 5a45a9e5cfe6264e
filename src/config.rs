//! Run configuration.
//!
//! [`CountOptions`] is a builder that carries every setting of a
//! [`pipeline::run`](crate::pipeline::run): directories, pool size, counting
//! strategy, optional transcoding, execution model, progress reporting, and
//! the manifest's name.
//!
//! # Example
//!
//! ```no_run
//! use framecount::{CountOptions, CountStrategy, TranscodePlan, VideoKind};
//!
//! let options = CountOptions::new()
//!     .with_source_dir("/data/clips")
//!     .with_output_dir("/data/out")
//!     .with_max_workers(8)
//!     .with_strategy(CountStrategy::Decode)
//!     .with_transcode(TranscodePlan::new(VideoKind::H264Raw, VideoKind::Mp4))
//!     .with_progress_interval(1_500);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::accountant::CountStrategy;
use crate::dispatcher::ExecutionModel;
use crate::error::FrameCountError;
use crate::kind::TranscodePlan;
use crate::progress::{NoOpProgress, ProgressCallback};

/// Default number of concurrently active workers.
pub const DEFAULT_MAX_WORKERS: usize = 20;

/// Default number of frames between per-file progress events.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// Default manifest filename.
pub const DEFAULT_MANIFEST_NAME: &str = "counts.csv";

/// Configuration for a counting run.
///
/// A default-constructed value counts every video in the current directory
/// by decoding, on 20 threads, and writes `./counts.csv`.
#[derive(Clone)]
pub struct CountOptions {
    pub(crate) source_dir: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) max_workers: usize,
    pub(crate) strategy: CountStrategy,
    pub(crate) transcode: Option<TranscodePlan>,
    pub(crate) execution: ExecutionModel,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) progress_interval: u64,
    pub(crate) manifest_name: String,
    pub(crate) archive_sources: Option<String>,
}

impl Debug for CountOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CountOptions")
            .field("source_dir", &self.source_dir)
            .field("output_dir", &self.output_dir)
            .field("max_workers", &self.max_workers)
            .field("strategy", &self.strategy)
            .field("transcode", &self.transcode)
            .field("execution", &self.execution)
            .field("has_progress", &true)
            .field("progress_interval", &self.progress_interval)
            .field("manifest_name", &self.manifest_name)
            .field("archive_sources", &self.archive_sources)
            .finish()
    }
}

impl Default for CountOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CountOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            max_workers: DEFAULT_MAX_WORKERS,
            strategy: CountStrategy::Decode,
            transcode: None,
            execution: ExecutionModel::Threads,
            progress: Arc::new(NoOpProgress),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            archive_sources: None,
        }
    }

    /// Directory scanned for video files.
    #[must_use]
    pub fn with_source_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.source_dir = directory.into();
        self
    }

    /// Directory receiving the manifest and any transcoded outputs.
    #[must_use]
    pub fn with_output_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.output_dir = directory.into();
        self
    }

    /// Maximum number of concurrently active workers. Clamped to at least 1.
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Counting strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: CountStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Convert matching files while counting. `None` disables transcoding.
    #[must_use]
    pub fn with_transcode(mut self, plan: Option<TranscodePlan>) -> Self {
        self.transcode = plan;
        self
    }

    /// Run tasks on threads or in isolated child processes.
    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionModel) -> Self {
        self.execution = execution;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Frames between per-file progress events. Clamped to at least 1.
    #[must_use]
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    /// Filename of the manifest inside the output directory.
    #[must_use]
    pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    /// After the manifest is written, move every transcoded source into this
    /// subdirectory of the source directory.
    #[must_use]
    pub fn with_archive_sources(mut self, directory: Option<String>) -> Self {
        self.archive_sources = directory;
        self
    }

    /// Directory scanned for video files.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Directory receiving outputs.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Configured pool size.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Full path the manifest is written to.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_name)
    }

    /// Check that the settings can be combined.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::InvalidOptions`] when transcoding is requested with
    /// the metadata strategy, or when the manifest or archive name is empty
    /// or not a bare filename.
    pub fn validate(&self) -> Result<(), FrameCountError> {
        if self.transcode.is_some() && self.strategy == CountStrategy::Metadata {
            return Err(FrameCountError::InvalidOptions(
                "transcoding requires the decode strategy".to_string(),
            ));
        }

        if !is_bare_filename(&self.manifest_name) {
            return Err(FrameCountError::InvalidOptions(format!(
                "manifest name {:?} must be a plain filename",
                self.manifest_name
            )));
        }

        if let Some(archive) = &self.archive_sources {
            if self.transcode.is_none() {
                log::warn!("Source archiving requested without transcoding; nothing will be moved");
            }
            if !is_bare_filename(archive) {
                return Err(FrameCountError::InvalidOptions(format!(
                    "archive directory {archive:?} must be a plain directory name"
                )));
            }
        }

        Ok(())
    }
}

fn is_bare_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}
