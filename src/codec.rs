//! The video codec boundary.
//!
//! Frame accounting and transcoding never talk to a decoder library
//! directly. They go through [`Codec`], which opens a [`VideoSource`] for
//! reading and a [`VideoSink`] for writing. Handles are released when they
//! are dropped, so every exit path of a worker (normal completion, early
//! return, panic) gives them back.
//!
//! [`FfmpegCodec`](crate::FfmpegCodec) is the production implementation.

use std::path::Path;

use crate::error::FrameCountError;
use crate::kind::VideoKind;

/// Frame size and rate reported by a source when it is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamGeometry {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second. Zero when the container does not say.
    pub frames_per_second: f64,
}

/// An opened video file being read frame by frame.
pub trait VideoSource {
    /// Decoded frame type handed to a [`VideoSink`].
    type Frame;

    /// Decode the next frame.
    ///
    /// `None` means the source is exhausted. End of stream and decode
    /// failure are both reported as `None`; implementations may log which
    /// one occurred.
    fn read_frame(&mut self) -> Option<Self::Frame>;

    /// Frame count as reported by the container, without decoding.
    ///
    /// Frequently wrong or zero for raw elementary streams.
    fn metadata_frame_count(&self) -> u64;

    /// Geometry reported at open time.
    fn geometry(&self) -> StreamGeometry;
}

/// An opened output file receiving frames.
pub trait VideoSink {
    /// Frame type accepted by [`write_frame`](VideoSink::write_frame).
    type Frame;

    /// Encode and write one frame.
    fn write_frame(&mut self, frame: &Self::Frame) -> Result<(), FrameCountError>;

    /// Flush buffered data and finalize the container.
    ///
    /// Dropping an unfinished sink finalizes it as well, but errors are then
    /// only logged.
    fn finish(&mut self) -> Result<(), FrameCountError>;
}

/// Factory for sources and sinks.
///
/// Implementations must be shareable between worker threads; each handle
/// they open is owned by exactly one worker.
pub trait Codec: Send + Sync {
    /// Frame type flowing from sources to sinks.
    type Frame;
    /// Reader handle.
    type Source: VideoSource<Frame = Self::Frame>;
    /// Writer handle.
    type Sink: VideoSink<Frame = Self::Frame>;

    /// Open `path` for reading.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::FileOpen`] if the file is missing, unreadable, or
    /// has a corrupt header, [`FrameCountError::NoVideoStream`] if it has no
    /// video stream.
    fn open(&self, path: &Path) -> Result<Self::Source, FrameCountError>;

    /// Create `path` as a `kind` file with the given geometry.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::WriterOpen`] if the container or encoder cannot be
    /// set up.
    fn open_writer(
        &self,
        path: &Path,
        kind: VideoKind,
        geometry: StreamGeometry,
    ) -> Result<Self::Sink, FrameCountError>;
}
