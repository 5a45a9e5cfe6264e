//! Error types for the `framecount` crate.
//!
//! This module defines [`FrameCountError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry the file or directory
//! they concern so a batch run can be diagnosed from the log alone.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// The unified error type for all `framecount` operations.
///
/// Per-file variants ([`FileOpen`](FrameCountError::FileOpen),
/// [`NoVideoStream`](FrameCountError::NoVideoStream),
/// [`Worker`](FrameCountError::Worker)) are isolated to that file's task by
/// the dispatcher. Run-level variants abort the pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameCountError {
    /// Discovery found no file with a recognized extension.
    #[error(
        "No video files have been found in {}. Either they have been deleted or the specified path is wrong.",
        .directory.display()
    )]
    NoVideoFiles {
        /// Directory that was scanned.
        directory: PathBuf,
    },

    /// The source directory could not be listed.
    #[error("Failed to read directory {}: {reason}", .path.display())]
    DirectoryRead {
        /// Directory that was scanned.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The codec could not open a video file.
    #[error("Failed to open video file at {}: {reason}", .path.display())]
    FileOpen {
        /// Path that was passed to the codec.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file opened but contains no video stream.
    #[error("No video stream found in {}", .path.display())]
    NoVideoStream {
        /// Path of the offending file.
        path: PathBuf,
    },

    /// The output writer for a transcoded file could not be opened.
    #[error("Failed to open video writer at {}: {reason}", .path.display())]
    WriterOpen {
        /// Path of the output file.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Encoding or muxing a frame failed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// Two input files map to the same output filename.
    #[error("Output filename {filename} would be produced by more than one input file")]
    DuplicateOutput {
        /// The colliding output filename.
        filename: String,
    },

    /// The supplied options cannot be combined.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// An isolated worker process failed for one file.
    #[error("Worker for {filename} failed: {reason}")]
    Worker {
        /// File the worker was processing.
        filename: String,
        /// Exit status or launch error.
        reason: String,
    },

    /// A worker request or response could not be (de)serialized.
    #[error("Malformed worker message: {0}")]
    WorkerProtocol(#[from] serde_json::Error),

    /// The manifest could not be written.
    #[error("Failed to write manifest to {}: {source}", .path.display())]
    ManifestWrite {
        /// Destination of the manifest.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },
}
