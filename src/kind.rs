//! Recognized video kinds and the output renaming rule.
//!
//! A [`VideoKind`] is inferred purely from a filename's extension. The table
//! below is the only place that knows which extensions exist and how a file
//! is renamed when converted. Codec backends choose the encoder per kind.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A codec/container kind recognized by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoKind {
    /// Raw H.264 elementary stream (`.h264`).
    H264Raw,
    /// MPEG-4 container (`.mp4`).
    Mp4,
}

impl VideoKind {
    /// Every recognized kind, in discovery order.
    pub const ALL: [VideoKind; 2] = [VideoKind::H264Raw, VideoKind::Mp4];

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            VideoKind::H264Raw => "h264",
            VideoKind::Mp4 => "mp4",
        }
    }

    /// Infer the kind from a filename by exact, case-sensitive suffix.
    ///
    /// A bare extension such as `".mp4"` still matches; `"clip.MP4"` does not.
    pub fn from_filename(filename: &str) -> Option<VideoKind> {
        Self::ALL.into_iter().find(|kind| {
            filename
                .strip_suffix(kind.extension())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// Replace this kind's extension on `filename` with `target`'s.
    ///
    /// Returns `None` when `filename` does not carry this kind's extension.
    pub fn rename(self, filename: &str, target: VideoKind) -> Option<String> {
        let stem = filename.strip_suffix(self.extension())?;
        stem.ends_with('.')
            .then(|| format!("{stem}{}", target.extension()))
    }
}

impl Display for VideoKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

/// A declarative `from → to` conversion applied to matching files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodePlan {
    /// Files of this kind are converted.
    pub from: VideoKind,
    /// Kind of the produced sibling file.
    pub to: VideoKind,
}

impl TranscodePlan {
    /// Create a plan. Returns `None` when `from == to`.
    pub fn new(from: VideoKind, to: VideoKind) -> Option<Self> {
        (from != to).then_some(Self { from, to })
    }

    /// Whether a file of `kind` is converted under this plan.
    pub fn applies_to(&self, kind: VideoKind) -> bool {
        kind == self.from
    }

    /// Output name for `filename`, or `None` when the plan does not apply.
    pub fn output_name(&self, filename: &str) -> Option<String> {
        self.from.rename(filename, self.to)
    }
}

/// A file found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// Bare filename, relative to the source directory.
    pub filename: String,
    /// Kind inferred from the extension.
    pub kind: VideoKind,
}

impl VideoFile {
    /// Build from a filename, or `None` if the extension is not recognized.
    pub fn from_filename(filename: impl Into<String>) -> Option<Self> {
        let filename = filename.into();
        let kind = VideoKind::from_filename(&filename)?;
        Some(Self { filename, kind })
    }

    /// Name this file's manifest row will carry under `plan`.
    pub fn output_name(&self, plan: Option<&TranscodePlan>) -> String {
        plan.and_then(|plan| plan.output_name(&self.filename))
            .unwrap_or_else(|| self.filename.clone())
    }
}
