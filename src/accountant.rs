//! Frame accounting strategies.
//!
//! [`CountStrategy::Decode`] decodes every frame and is exact for any file
//! the decoder can read to the end. [`CountStrategy::Metadata`] trusts the
//! container's own count: fast, but frequently wrong or zero for raw H.264
//! elementary streams, which carry no frame index.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{Codec, VideoSource};
use crate::error::FrameCountError;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};

/// How a file's frames are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CountStrategy {
    /// Decode every frame and count them.
    #[default]
    Decode,
    /// Read the container-reported count without decoding.
    Metadata,
}

/// Count the frames of `path` by decoding all of them.
///
/// Decoding stops at end of stream or at the first decode error; the frames
/// read until then are the count. A file with no decodable frame counts 0.
///
/// # Errors
///
/// Whatever [`Codec::open`] returns for `path`.
pub fn count_by_decoding<C: Codec>(
    codec: &C,
    path: &Path,
    progress: &Arc<dyn ProgressCallback>,
    progress_interval: u64,
) -> Result<u64, FrameCountError> {
    let mut source = codec.open(path)?;
    let mut tracker = ProgressTracker::new(
        Arc::clone(progress),
        OperationType::Counting,
        Some(display_name(path)),
        None,
        progress_interval,
    );

    let frames = drain_frames(&mut source, &mut tracker, path, |_| {});
    log::debug!("Decoded {frames} frames from {}", path.display());
    Ok(frames)
}

/// Read the container-reported frame count of `path`.
///
/// # Errors
///
/// Whatever [`Codec::open`] returns for `path`.
pub fn count_from_metadata<C: Codec>(codec: &C, path: &Path) -> Result<u64, FrameCountError> {
    let source = codec.open(path)?;
    let frames = source.metadata_frame_count();
    log::debug!("Container of {} reports {frames} frames", path.display());
    Ok(frames)
}

/// Pull frames until the source is exhausted, handing each to `each`.
pub(crate) fn drain_frames<S: VideoSource>(
    source: &mut S,
    tracker: &mut ProgressTracker,
    path: &Path,
    mut each: impl FnMut(&S::Frame),
) -> u64 {
    while let Some(frame) = source.read_frame() {
        each(&frame);
        if tracker.advance() {
            log::debug!(
                "Processed {} frames of {}",
                tracker.current(),
                path.display()
            );
        }
    }
    tracker.current()
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
