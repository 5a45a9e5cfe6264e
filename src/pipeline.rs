//! End-to-end run: discover, dispatch, write the manifest.
//!
//! # Example
//!
//! ```no_run
//! use framecount::{CountOptions, FfmpegCodec, pipeline};
//!
//! let options = CountOptions::new().with_source_dir("videos").with_output_dir("out");
//! let report = pipeline::run(&options, &FfmpegCodec::new())?;
//! println!("{} rows in {}", report.recorded, report.manifest_path.display());
//! # Ok::<(), framecount::FrameCountError>(())
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codec::Codec;
use crate::config::CountOptions;
use crate::discovery::discover;
use crate::dispatcher::Dispatcher;
use crate::error::FrameCountError;
use crate::worker::WorkerTask;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Video files found by discovery.
    pub discovered: usize,
    /// Rows written to the manifest.
    pub recorded: usize,
    /// Source filenames whose task failed and have no row.
    pub failed: Vec<String>,
    /// Source filenames that were converted, sorted.
    pub transcoded: Vec<String>,
    /// Sources moved into the archive directory.
    pub archived: usize,
    /// Where the manifest was written.
    pub manifest_path: PathBuf,
}

/// Run the whole pipeline with `codec`.
///
/// Nothing is written when discovery finds no video, or when two sources
/// would produce the same output name.
///
/// # Errors
///
/// - [`FrameCountError::InvalidOptions`] from [`CountOptions::validate`].
/// - [`FrameCountError::NoVideoFiles`] / [`FrameCountError::DirectoryRead`]
///   from discovery.
/// - [`FrameCountError::DuplicateOutput`] for colliding output names.
/// - [`FrameCountError::IoError`] if the output directory cannot be created.
/// - [`FrameCountError::WorkerPool`] / [`FrameCountError::ManifestWrite`].
pub fn run<C: Codec>(options: &CountOptions, codec: &C) -> Result<RunReport, FrameCountError> {
    options.validate()?;
    log::debug!("Starting run with {options:?}");

    let files = discover(&options.source_dir)?;

    let mut planned = HashSet::with_capacity(files.len());
    for file in &files {
        let output_name = file.output_name(options.transcode.as_ref());
        if !planned.insert(output_name.clone()) {
            return Err(FrameCountError::DuplicateOutput {
                filename: output_name,
            });
        }
    }

    ensure_directory_exists(&options.output_dir)?;

    let tasks: Vec<WorkerTask> = files
        .iter()
        .map(|file| WorkerTask {
            source_dir: options.source_dir.clone(),
            output_dir: options.output_dir.clone(),
            filename: file.filename.clone(),
        })
        .collect();

    let outcome = Dispatcher::new(codec, options).run(&tasks)?;

    let manifest = outcome.aggregator.into_manifest()?;
    let manifest_path = options.manifest_path();
    manifest.write_csv(&manifest_path)?;

    let mut transcoded = outcome.transcoded;
    transcoded.sort();

    let archived = match &options.archive_sources {
        Some(archive) if !transcoded.is_empty() => {
            archive_sources(&options.source_dir, archive, &transcoded)?
        }
        _ => 0,
    };

    let report = RunReport {
        discovered: files.len(),
        recorded: manifest.len(),
        failed: outcome.failed,
        transcoded,
        archived,
        manifest_path,
    };

    log::info!(
        "Counted {} of {} files ({} failed, {} converted)",
        report.recorded,
        report.discovered,
        report.failed.len(),
        report.transcoded.len()
    );
    Ok(report)
}

/// Create `path` and its parents if missing.
fn ensure_directory_exists(path: &Path) -> Result<(), FrameCountError> {
    if !path.exists() {
        log::debug!("Creating directory {}", path.display());
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Move `filenames` from `source_dir` into `source_dir/archive`.
///
/// A file that cannot be moved is logged and left in place.
fn archive_sources(
    source_dir: &Path,
    archive: &str,
    filenames: &[String],
) -> Result<usize, FrameCountError> {
    let archive_dir = source_dir.join(archive);
    ensure_directory_exists(&archive_dir)?;

    let mut moved = 0;
    for filename in filenames {
        let from = source_dir.join(filename);
        let to = archive_dir.join(filename);
        match fs::rename(&from, &to) {
            Ok(()) => moved += 1,
            Err(error) => log::warn!(
                "Could not move {} to {}: {error}",
                from.display(),
                to.display()
            ),
        }
    }

    log::info!(
        "Moved {moved} source files to {}",
        archive_dir.display()
    );
    Ok(moved)
}
