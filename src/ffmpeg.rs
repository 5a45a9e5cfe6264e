//! FFmpeg-backed [`Codec`] implementation.
//!
//! [`FfmpegCodec`] opens inputs with `ffmpeg-next`, decodes the best video
//! stream packet by packet, and re-encodes frames through a muxer chosen
//! from the output file's extension.
//!
//! FFmpeg has its own internal logging, separate from the Rust
//! [`log`](https://crates.io/crates/log) facade. Use
//! [`set_ffmpeg_verbosity`] to tune what it prints to stderr.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framecount::{Codec, FfmpegCodec, FfmpegVerbosity, VideoSource};
//!
//! framecount::set_ffmpeg_verbosity(FfmpegVerbosity::Error);
//!
//! let mut source = FfmpegCodec::new().open(Path::new("clip.mp4"))?;
//! let mut frames = 0_u64;
//! while source.read_frame().is_some() {
//!     frames += 1;
//! }
//! println!("{frames} decoded, container says {}", source.metadata_frame_count());
//! # Ok::<(), framecount::FrameCountError>(())
//! ```

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{Flags as CodecFlags, Id, context::Context as CodecContext},
    decoder::Video as VideoDecoder,
    encoder::video::Encoder as VideoEncoder,
    format::{
        Flags as FormatFlags, Pixel,
        context::{Input, Output},
    },
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};

use crate::codec::{Codec, StreamGeometry, VideoSink, VideoSource};
use crate::error::FrameCountError;
use crate::kind::VideoKind;

/// Frame rate assumed when the source reports none (FFmpeg's raw H.264 default).
const FALLBACK_FRAMES_PER_SECOND: f64 = 25.0;

/// FFmpeg's internal time base for container durations (microseconds).
const CONTAINER_TIME_BASE: f64 = 1_000_000.0;

/// FFmpeg internal log verbosity.
///
/// A subset of FFmpeg's `AV_LOG_*` levels; each level suppresses every
/// message below its severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegVerbosity {
    /// Print nothing.
    Quiet,
    /// Recoverable and unrecoverable errors only.
    Error,
    /// Warnings and errors (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging messages.
    Debug,
}

impl FfmpegVerbosity {
    /// Parse a level name such as `"quiet"` or `"warn"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" | "off" => Some(FfmpegVerbosity::Quiet),
            "error" => Some(FfmpegVerbosity::Error),
            "warning" | "warn" => Some(FfmpegVerbosity::Warning),
            "info" => Some(FfmpegVerbosity::Info),
            "debug" => Some(FfmpegVerbosity::Debug),
            _ => None,
        }
    }

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegVerbosity::Quiet => Level::Quiet,
            FfmpegVerbosity::Error => Level::Error,
            FfmpegVerbosity::Warning => Level::Warning,
            FfmpegVerbosity::Info => Level::Info,
            FfmpegVerbosity::Debug => Level::Debug,
        }
    }
}

/// Set FFmpeg's internal log verbosity.
///
/// This controls what FFmpeg itself prints to stderr. It does **not** affect
/// Rust-side `log` output.
pub fn set_ffmpeg_verbosity(level: FfmpegVerbosity) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// The production codec, backed by the system FFmpeg libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegCodec;

impl FfmpegCodec {
    /// Create the codec. FFmpeg itself is initialized lazily on first open.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for FfmpegCodec {
    type Frame = VideoFrame;
    type Source = FfmpegSource;
    type Sink = FfmpegSink;

    fn open(&self, path: &Path) -> Result<FfmpegSource, FrameCountError> {
        FfmpegSource::open(path)
    }

    fn open_writer(
        &self,
        path: &Path,
        kind: VideoKind,
        geometry: StreamGeometry,
    ) -> Result<FfmpegSink, FrameCountError> {
        FfmpegSink::create(path, kind, geometry)
    }
}

/// A demuxer plus decoder for the best video stream of one file.
pub struct FfmpegSource {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    geometry: StreamGeometry,
    metadata_frame_count: u64,
    path: PathBuf,
    eof_sent: bool,
    exhausted: bool,
}

impl FfmpegSource {
    fn open(path: &Path) -> Result<Self, FrameCountError> {
        let file_open = |reason: String| FrameCountError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init()
            .map_err(|error| file_open(format!("FFmpeg initialisation failed: {error}")))?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| file_open(error.to_string()))?;

        let (stream_index, decoder, frames_per_second, reported_frames) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or_else(|| FrameCountError::NoVideoStream {
                    path: path.to_path_buf(),
                })?;

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| file_open(format!("Failed to create video decoder: {error}")))?;

            let frames_per_second = rational_to_f64(stream.avg_frame_rate())
                .or_else(|| rational_to_f64(stream.rate()))
                .unwrap_or(0.0);

            (stream.index(), decoder, frames_per_second, stream.frames())
        };

        let duration_seconds = if input.duration() > 0 {
            input.duration() as f64 / CONTAINER_TIME_BASE
        } else {
            0.0
        };

        let geometry = StreamGeometry {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
        };
        let metadata_frame_count =
            container_frame_count(reported_frames, duration_seconds, frames_per_second);

        log::debug!(
            "Opened {}: stream={}, {}x{} @ {:.2} fps, container reports {} frames",
            path.display(),
            stream_index,
            geometry.width,
            geometry.height,
            geometry.frames_per_second,
            metadata_frame_count,
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            geometry,
            metadata_frame_count,
            path: path.to_path_buf(),
            eof_sent: false,
            exhausted: false,
        })
    }

    fn stop(&mut self, cause: &str) -> Option<VideoFrame> {
        log::warn!(
            "Stopped reading {} early: {cause}; frames decoded so far are kept",
            self.path.display()
        );
        self.exhausted = true;
        None
    }
}

impl VideoSource for FfmpegSource {
    type Frame = VideoFrame;

    fn read_frame(&mut self) -> Option<VideoFrame> {
        if self.exhausted {
            return None;
        }

        let mut frame = VideoFrame::empty();
        loop {
            if self.decoder.receive_frame(&mut frame).is_ok() {
                return Some(frame);
            }

            if self.eof_sent {
                self.exhausted = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        return self.stop(&format!("decode error: {error}"));
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.stop(&format!("decoder flush failed: {error}"));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    return self.stop(&format!("read error: {error}"));
                }
            }
        }
    }

    fn metadata_frame_count(&self) -> u64 {
        self.metadata_frame_count
    }

    fn geometry(&self) -> StreamGeometry {
        self.geometry
    }
}

/// An encoder plus muxer writing one output file.
///
/// The container is inferred from the path's extension; the encoder comes
/// from the requested [`VideoKind`].
pub struct FfmpegSink {
    output: Output,
    encoder: VideoEncoder,
    scaler: Option<ScalingContext>,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
    path: PathBuf,
    finished: bool,
}

impl FfmpegSink {
    fn create(
        path: &Path,
        kind: VideoKind,
        geometry: StreamGeometry,
    ) -> Result<Self, FrameCountError> {
        let writer_open = |reason: String| FrameCountError::WriterOpen {
            path: path.to_path_buf(),
            reason,
        };

        log::debug!(
            "Opening video writer: {} ({kind}, {}x{} @ {:.2} fps)",
            path.display(),
            geometry.width,
            geometry.height,
            geometry.frames_per_second,
        );

        ffmpeg_next::init()
            .map_err(|error| writer_open(format!("FFmpeg initialisation failed: {error}")))?;

        let mut output = ffmpeg_next::format::output(&path)
            .map_err(|error| writer_open(format!("cannot open output: {error}")))?;

        // Read before add_stream borrows the output mutably.
        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let codec_id = encoder_id(kind);
        let encoder_codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| writer_open(format!("encoder {codec_id:?} not available")))?;

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|error| writer_open(format!("cannot add stream: {error}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|error| writer_open(format!("cannot create encoder context: {error}")))?;

        let frame_rate = frames_per_second_to_rational(geometry.frames_per_second);
        let encoder_time_base = frame_rate.invert();

        encoder.set_width(geometry.width);
        encoder.set_height(geometry.height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(frame_rate));
        if needs_global_header {
            encoder.set_flags(CodecFlags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_as(encoder_codec)
            .map_err(|error| writer_open(format!("cannot open encoder: {error}")))?;
        stream.set_parameters(&encoder);

        output
            .write_header()
            .map_err(|error| writer_open(format!("cannot write header: {error}")))?;

        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| writer_open("output stream disappeared after header".to_string()))?;

        Ok(Self {
            output,
            encoder,
            scaler: None,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width: geometry.width,
            height: geometry.height,
            next_pts: 0,
            path: path.to_path_buf(),
            finished: false,
        })
    }

    /// Convert `frame` to the encoder's pixel format and size when needed.
    fn prepare(&mut self, frame: &VideoFrame) -> Result<VideoFrame, FrameCountError> {
        if frame.format() == Pixel::YUV420P
            && frame.width() == self.width
            && frame.height() == self.height
        {
            return Ok(frame.clone());
        }

        if self.scaler.is_none() {
            let scaler = ScalingContext::get(
                frame.format(),
                frame.width(),
                frame.height(),
                Pixel::YUV420P,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|error| {
                FrameCountError::VideoEncodeError(format!("cannot create scaler: {error}"))
            })?;
            self.scaler = Some(scaler);
        }

        let mut converted = VideoFrame::empty();
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(frame, &mut converted).map_err(|error| {
                FrameCountError::VideoEncodeError(format!("scaling failed: {error}"))
            })?;
        }
        Ok(converted)
    }

    fn write_pending_packets(&mut self) -> Result<(), FrameCountError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output).map_err(|error| {
                FrameCountError::VideoEncodeError(format!("write packet failed: {error}"))
            })?;
        }
        Ok(())
    }
}

impl VideoSink for FfmpegSink {
    type Frame = VideoFrame;

    fn write_frame(&mut self, frame: &VideoFrame) -> Result<(), FrameCountError> {
        let mut prepared = self.prepare(frame)?;
        prepared.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&prepared).map_err(|error| {
            FrameCountError::VideoEncodeError(format!("send_frame failed: {error}"))
        })?;
        self.write_pending_packets()
    }

    fn finish(&mut self) -> Result<(), FrameCountError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.encoder.send_eof().map_err(|error| {
            FrameCountError::VideoEncodeError(format!("send_eof failed: {error}"))
        })?;
        self.write_pending_packets()?;
        self.output.write_trailer().map_err(|error| {
            FrameCountError::VideoEncodeError(format!("cannot write trailer: {error}"))
        })?;

        log::debug!(
            "Video writer {} released after {} frames",
            self.path.display(),
            self.next_pts
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(error) = self.finish() {
            log::warn!(
                "Failed to finalize {} while releasing it: {error}",
                self.path.display()
            );
        }
    }
}

fn encoder_id(kind: VideoKind) -> Id {
    match kind {
        VideoKind::H264Raw => Id::H264,
        // MPEG-4 Part 2, the `mp4v` fourcc.
        VideoKind::Mp4 => Id::MPEG4,
    }
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0)
        .then(|| f64::from(rate.numerator()) / f64::from(rate.denominator()))
}

/// Container frame count, estimated from duration when `nb_frames` is absent.
fn container_frame_count(reported: i64, duration_seconds: f64, frames_per_second: f64) -> u64 {
    if reported > 0 {
        reported as u64
    } else if duration_seconds > 0.0 && frames_per_second > 0.0 {
        (duration_seconds * frames_per_second).round() as u64
    } else {
        0
    }
}

/// Express a frame rate as a reduced fraction with millisecond precision.
///
/// Keeps denominators small enough for the MPEG-4 encoder's 16-bit time base.
fn frames_per_second_to_rational(frames_per_second: f64) -> Rational {
    let frames_per_second = if frames_per_second.is_finite() && frames_per_second > 0.0 {
        frames_per_second
    } else {
        FALLBACK_FRAMES_PER_SECOND
    };

    let numerator = (frames_per_second * 1000.0).round() as i32;
    let divisor = greatest_common_divisor(numerator, 1000);
    Rational::new(numerator / divisor, 1000 / divisor)
}

fn greatest_common_divisor(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.abs().max(1)
}
