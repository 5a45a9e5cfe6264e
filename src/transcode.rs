//! Count-while-converting.
//!
//! [`transcode_and_count`] runs the decode-count loop and writes every
//! decoded frame to a sibling file of the plan's target kind. Counting
//! always wins: a writer that cannot be opened, or that fails halfway,
//! never costs the file its manifest row.
//!
//! | Writer state            | Output file     | Row name      |
//! |-------------------------|-----------------|---------------|
//! | opened, all frames ok   | complete        | target name   |
//! | failed mid-stream       | partial         | target name   |
//! | could not be opened     | none            | source name   |

use std::path::Path;
use std::sync::Arc;

use crate::accountant::{display_name, drain_frames};
use crate::codec::{Codec, VideoSink, VideoSource};
use crate::error::FrameCountError;
use crate::kind::TranscodePlan;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};

/// Result of counting one file while converting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    /// Frames decoded from the source.
    pub frames: u64,
    /// Name the manifest row carries.
    pub output_name: String,
    /// Whether an output file was produced (complete or partial).
    pub transcoded: bool,
}

/// Count the frames of `source_path` while converting it into `output_dir`.
///
/// The output lands at `output_dir/<stem>.<target extension>` with the
/// source's width, height, and frame rate. When the plan does not apply to
/// the file the call degrades to a plain decode count.
///
/// # Errors
///
/// Only when the source cannot be opened. Writer problems are logged as
/// warnings.
pub fn transcode_and_count<C: Codec>(
    codec: &C,
    source_path: &Path,
    output_dir: &Path,
    plan: &TranscodePlan,
    progress: &Arc<dyn ProgressCallback>,
    progress_interval: u64,
) -> Result<TranscodeOutcome, FrameCountError> {
    let source_name = display_name(source_path);
    let mut source = codec.open(source_path)?;

    let target_name = plan.output_name(&source_name);
    let mut sink = match &target_name {
        Some(target_name) => {
            let target_path = output_dir.join(target_name);
            match codec.open_writer(&target_path, plan.to, source.geometry()) {
                Ok(sink) => {
                    log::info!(
                        "Converting {} to {}",
                        source_path.display(),
                        target_path.display()
                    );
                    Some(sink)
                }
                Err(error) => {
                    log::warn!(
                        "Cannot write {}; counting {source_name} without converting it: {error}",
                        target_path.display()
                    );
                    None
                }
            }
        }
        None => None,
    };
    let transcoded = sink.is_some();

    let mut tracker = ProgressTracker::new(
        Arc::clone(progress),
        OperationType::Transcoding,
        Some(source_name.clone()),
        None,
        progress_interval,
    );

    let frames = drain_frames(&mut source, &mut tracker, source_path, |frame| {
        let failure = match sink.as_mut() {
            Some(writer) => writer.write_frame(frame).err(),
            None => None,
        };
        if let Some(error) = failure {
            log::warn!("Abandoning conversion of {source_name}: {error}");
            // Dropping the writer finalizes whatever was written so far.
            sink = None;
        }
    });

    if let Some(mut writer) = sink {
        if let Err(error) = writer.finish() {
            log::warn!("Failed to finalize conversion of {source_name}: {error}");
        }
    }

    let output_name = match target_name {
        Some(target_name) if transcoded => target_name,
        _ => source_name,
    };
    log::debug!("Decoded {frames} frames from {}", source_path.display());

    Ok(TranscodeOutcome {
        frames,
        output_name,
        transcoded,
    })
}
