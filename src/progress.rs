//! Progress reporting.
//!
//! This module provides [`ProgressCallback`] for monitoring a run and
//! [`ProgressInfo`] for the snapshots it receives. Per-file events
//! ([`OperationType::Counting`], [`OperationType::Transcoding`]) fire every
//! [`progress_interval`](crate::CountOptions::with_progress_interval) frames;
//! [`OperationType::Dispatch`] fires once per completed file.
//!
//! Callbacks may run on any worker thread, concurrently.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framecount::{CountOptions, OperationType, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if info.operation == OperationType::Dispatch {
//!             println!("{}/{} files done", info.current, info.total.unwrap_or(0));
//!         }
//!     }
//! }
//!
//! let options = CountOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of work a progress event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding a file to count its frames.
    Counting,
    /// Decoding a file while writing a converted copy.
    Transcoding,
    /// Files completed across the whole pool.
    Dispatch,
}

/// A snapshot of progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// File being processed. `None` for [`OperationType::Dispatch`].
    pub filename: Option<String>,
    /// Frames (or files, for dispatch) processed so far.
    pub current: u64,
    /// Total expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the operation started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks are
/// invoked from worker threads. Callbacks observe; they cannot halt a run.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an operation.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Writes per-file progress to the `log` facade at info level.
///
/// Dispatch events are logged at debug level so they do not drown out the
/// per-file lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match (&info.operation, &info.filename) {
            (OperationType::Dispatch, _) | (_, None) => log::debug!(
                "{:?}: {} of {} done",
                info.operation,
                info.current,
                info.total.map_or_else(|| "?".to_string(), |total| total.to_string()),
            ),
            (_, Some(filename)) => {
                log::info!("Processed {} frames of {filename}", info.current)
            }
        }
    }
}

/// Tracks timing and fires a callback every `interval` items.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    filename: Option<String>,
    total: Option<u64>,
    current: u64,
    interval: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        filename: Option<String>,
        total: Option<u64>,
        interval: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            filename,
            total,
            current: 0,
            interval: interval.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item; returns `true` when a report was emitted.
    pub(crate) fn advance(&mut self) -> bool {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.interval {
            self.report();
            self.items_since_last_report = 0;
            return true;
        }
        false
    }

    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    fn report(&self) {
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32) * 100.0);

        let info = ProgressInfo {
            operation: self.operation,
            filename: self.filename.clone(),
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
        };

        self.callback.on_progress(&info);
    }
}
