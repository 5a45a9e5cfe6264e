//! # framecount
//!
//! Count the frames of every video in a directory, optionally convert them
//! between raw H.264 and MP4 along the way, and write a sorted
//! `filename,framecount` manifest.
//!
//! Files are processed by a bounded worker pool, either on threads or in
//! isolated child processes. Decoding and encoding go through the
//! [`Codec`] trait; [`FfmpegCodec`] is the implementation backed by
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next).
//!
//! ## Quick Start
//!
//! ### Count a directory
//!
//! ```no_run
//! use framecount::{CountOptions, FfmpegCodec, pipeline};
//!
//! let options = CountOptions::new()
//!     .with_source_dir("/data/clips")
//!     .with_output_dir("/data/clips")
//!     .with_max_workers(8);
//!
//! let report = pipeline::run(&options, &FfmpegCodec::new())?;
//! println!("wrote {}", report.manifest_path.display());
//! # Ok::<(), framecount::FrameCountError>(())
//! ```
//!
//! ### Convert while counting
//!
//! ```no_run
//! use framecount::{CountOptions, FfmpegCodec, TranscodePlan, VideoKind, pipeline};
//!
//! let options = CountOptions::new()
//!     .with_source_dir("raw")
//!     .with_output_dir("converted")
//!     .with_transcode(TranscodePlan::new(VideoKind::H264Raw, VideoKind::Mp4));
//!
//! pipeline::run(&options, &FfmpegCodec::new())?;
//! # Ok::<(), framecount::FrameCountError>(())
//! ```
//!
//! ### Count one file
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use framecount::{FfmpegCodec, LogProgress, ProgressCallback, count_by_decoding};
//!
//! let progress: Arc<dyn ProgressCallback> = Arc::new(LogProgress);
//! let frames = count_by_decoding(&FfmpegCodec::new(), Path::new("a.mp4"), &progress, 1_000)?;
//! # Ok::<(), framecount::FrameCountError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod accountant;
pub mod aggregator;
pub mod codec;
pub mod config;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod ffmpeg;
pub mod kind;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod transcode;
pub mod worker;

pub use accountant::{CountStrategy, count_by_decoding, count_from_metadata};
pub use aggregator::ResultAggregator;
pub use codec::{Codec, StreamGeometry, VideoSink, VideoSource};
pub use config::{CountOptions, DEFAULT_MANIFEST_NAME, DEFAULT_MAX_WORKERS, DEFAULT_PROGRESS_INTERVAL};
pub use discovery::discover;
pub use dispatcher::{DispatchOutcome, Dispatcher, ExecutionModel, WorkerCommand};
pub use error::FrameCountError;
pub use ffmpeg::{FfmpegCodec, FfmpegSink, FfmpegSource, FfmpegVerbosity, set_ffmpeg_verbosity};
pub use kind::{TranscodePlan, VideoFile, VideoKind};
pub use manifest::{Manifest, ManifestRow};
pub use pipeline::RunReport;
pub use progress::{LogProgress, OperationType, ProgressCallback, ProgressInfo};
pub use transcode::{TranscodeOutcome, transcode_and_count};
pub use worker::{TaskOutcome, TaskSettings, WorkerRequest, WorkerTask, process_task, serve};
