//! A synthetic codec for exercising the pipeline without FFmpeg.
//!
//! "Video" files are one-line text descriptions such as
//! `frames=50 metadata=50 width=64 height=48 fps=25`. Anything else fails
//! to open. Converted outputs are written in the same format, so a
//! converted file can be counted again.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use framecount::{Codec, FrameCountError, StreamGeometry, VideoKind, VideoSink, VideoSource};

/// Description of one synthetic clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticClip {
    pub frames: u64,
    pub metadata: u64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub panics: bool,
}

impl SyntheticClip {
    pub fn new(frames: u64) -> Self {
        Self {
            frames,
            metadata: frames,
            width: 64,
            height: 48,
            fps: 25.0,
            panics: false,
        }
    }

    pub fn with_metadata(mut self, metadata: u64) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn render(&self) -> String {
        format!(
            "frames={} metadata={} width={} height={} fps={}{}",
            self.frames,
            self.metadata,
            self.width,
            self.height,
            self.fps,
            if self.panics { " panic=1" } else { "" }
        )
    }

    pub fn parse(text: &str) -> Option<Self> {
        let mut clip = SyntheticClip::new(0);
        let mut saw_frames = false;
        for pair in text.split_whitespace() {
            let (key, value) = pair.split_once('=')?;
            match key {
                "frames" => {
                    clip.frames = value.parse().ok()?;
                    saw_frames = true;
                }
                "metadata" => clip.metadata = value.parse().ok()?,
                "width" => clip.width = value.parse().ok()?,
                "height" => clip.height = value.parse().ok()?,
                "fps" => clip.fps = value.parse().ok()?,
                "panic" => clip.panics = value == "1",
                _ => return None,
            }
        }
        saw_frames.then_some(clip)
    }
}

/// Write `clip` to `dir/name`.
pub fn write_clip(dir: &Path, name: &str, clip: &SyntheticClip) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, clip.render()).expect("write synthetic clip");
    path
}

/// Write a well-formed clip with `frames` frames.
pub fn write_frames(dir: &Path, name: &str, frames: u64) -> PathBuf {
    write_clip(dir, name, &SyntheticClip::new(frames))
}

/// Read back a clip written by a [`SyntheticSink`].
pub fn read_clip(path: &Path) -> SyntheticClip {
    let text = fs::read_to_string(path).expect("read synthetic output");
    SyntheticClip::parse(&text).expect("parse synthetic output")
}

/// Codec over [`SyntheticClip`] files.
#[derive(Debug, Default)]
pub struct SyntheticCodec {
    writer_fails: bool,
    fail_writes_after: Option<u64>,
    frame_delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SyntheticCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `open_writer` call fails.
    pub fn with_writer_failure(mut self) -> Self {
        self.writer_fails = true;
        self
    }

    /// Writers accept `frames` frames, then error.
    pub fn with_write_failure_after(mut self, frames: u64) -> Self {
        self.fail_writes_after = Some(frames);
        self
    }

    /// Sleep this long per decoded frame, to make tasks overlap.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Highest number of sources open at the same time.
    pub fn peak_open_sources(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Sources currently open.
    pub fn open_sources(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct OpenGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct SyntheticSource {
    clip: SyntheticClip,
    next: u64,
    delay: Duration,
    _guard: OpenGuard,
}

impl VideoSource for SyntheticSource {
    type Frame = u64;

    fn read_frame(&mut self) -> Option<u64> {
        if self.clip.panics {
            panic!("synthetic decoder crashed");
        }
        if self.next >= self.clip.frames {
            return None;
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.next += 1;
        Some(self.next - 1)
    }

    fn metadata_frame_count(&self) -> u64 {
        self.clip.metadata
    }

    fn geometry(&self) -> StreamGeometry {
        StreamGeometry {
            width: self.clip.width,
            height: self.clip.height,
            frames_per_second: self.clip.fps,
        }
    }
}

pub struct SyntheticSink {
    path: PathBuf,
    geometry: StreamGeometry,
    written: u64,
    fail_after: Option<u64>,
    finished: bool,
}

impl VideoSink for SyntheticSink {
    type Frame = u64;

    fn write_frame(&mut self, _frame: &u64) -> Result<(), FrameCountError> {
        if self.fail_after.is_some_and(|limit| self.written >= limit) {
            return Err(FrameCountError::VideoEncodeError(
                "synthetic disk full".to_string(),
            ));
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FrameCountError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let clip = SyntheticClip {
            frames: self.written,
            metadata: self.written,
            width: self.geometry.width,
            height: self.geometry.height,
            fps: self.geometry.frames_per_second,
            panics: false,
        };
        fs::write(&self.path, clip.render())?;
        Ok(())
    }
}

impl Drop for SyntheticSink {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

impl Codec for SyntheticCodec {
    type Frame = u64;
    type Source = SyntheticSource;
    type Sink = SyntheticSink;

    fn open(&self, path: &Path) -> Result<SyntheticSource, FrameCountError> {
        let file_open = |reason: &str| FrameCountError::FileOpen {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let text = fs::read_to_string(path).map_err(|error| file_open(&error.to_string()))?;
        let clip = SyntheticClip::parse(&text).ok_or_else(|| file_open("corrupt header"))?;

        let now_open = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_open, Ordering::SeqCst);

        Ok(SyntheticSource {
            clip,
            next: 0,
            delay: self.frame_delay,
            _guard: OpenGuard {
                active: Arc::clone(&self.active),
            },
        })
    }

    fn open_writer(
        &self,
        path: &Path,
        _kind: VideoKind,
        geometry: StreamGeometry,
    ) -> Result<SyntheticSink, FrameCountError> {
        if self.writer_fails {
            return Err(FrameCountError::WriterOpen {
                path: path.to_path_buf(),
                reason: "synthetic encoder missing".to_string(),
            });
        }

        Ok(SyntheticSink {
            path: path.to_path_buf(),
            geometry,
            written: 0,
            fail_after: self.fail_writes_after,
            finished: false,
        })
    }
}
