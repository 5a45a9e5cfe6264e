//! FFmpeg codec integration tests.
//!
//! Clips are generated with the codec's own writer, so only the FFmpeg
//! libraries are needed. The `sample_video` tests additionally require
//! `tests/fixtures/sample_video.mp4` and return early without it.

use std::path::Path;
use std::sync::Arc;

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};
use framecount::{
    Codec, CountOptions, FfmpegCodec, FfmpegVerbosity, FrameCountError, LogProgress,
    ProgressCallback, StreamGeometry, TaskSettings, TranscodePlan, VideoKind, VideoSink,
    WorkerTask, count_by_decoding, count_from_metadata, pipeline, process_task,
    transcode_and_count,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn progress() -> Arc<dyn ProgressCallback> {
    Arc::new(LogProgress)
}

fn geometry() -> StreamGeometry {
    StreamGeometry {
        width: 64,
        height: 48,
        frames_per_second: 25.0,
    }
}

fn gray_frame(shade: u8) -> VideoFrame {
    let mut frame = VideoFrame::new(Pixel::YUV420P, 64, 48);
    frame.data_mut(0).fill(shade);
    frame.data_mut(1).fill(128);
    frame.data_mut(2).fill(128);
    frame
}

/// Luma noise, so every encoded frame carries a similar share of the bytes.
fn noise_frame(seed: u64) -> VideoFrame {
    let mut frame = gray_frame(0);
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    for byte in frame.data_mut(0).iter_mut() {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        *byte = (state >> 56) as u8;
    }
    frame
}

fn write_mp4(path: &Path, frames: u64) {
    framecount::set_ffmpeg_verbosity(FfmpegVerbosity::Error);
    let mut sink = FfmpegCodec::new()
        .open_writer(path, VideoKind::Mp4, geometry())
        .expect("open writer");
    for index in 0..frames {
        sink.write_frame(&gray_frame((index * 7 % 255) as u8))
            .expect("write frame");
    }
    sink.finish().expect("finish");
}

// ── Generated clips ────────────────────────────────────────────────

#[test]
fn decode_and_metadata_agree_on_written_mp4() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("generated.mp4");
    write_mp4(&path, 30);

    let codec = FfmpegCodec::new();
    assert_eq!(count_by_decoding(&codec, &path, &progress(), 10).expect("decode"), 30);
    assert_eq!(count_from_metadata(&codec, &path).expect("metadata"), 30);
}

#[test]
fn dropped_writer_still_produces_a_readable_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dropped.mp4");
    {
        let mut sink = FfmpegCodec::new()
            .open_writer(&path, VideoKind::Mp4, geometry())
            .expect("open writer");
        for _ in 0..12 {
            sink.write_frame(&gray_frame(90)).expect("write frame");
        }
    }

    let frames = count_by_decoding(&FfmpegCodec::new(), &path, &progress(), 10).expect("decode");
    assert_eq!(frames, 12);
}

#[test]
fn converting_preserves_the_frame_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("clip.mp4");
    write_mp4(&path, 20);

    let plan = TranscodePlan::new(VideoKind::Mp4, VideoKind::H264Raw).expect("plan");
    let codec = FfmpegCodec::new();
    let outcome =
        transcode_and_count(&codec, &path, dir.path(), &plan, &progress(), 10).expect("run");

    assert_eq!(outcome.frames, 20);
    if outcome.transcoded {
        assert_eq!(outcome.output_name, "clip.h264");
        let recount = count_by_decoding(&codec, &dir.path().join("clip.h264"), &progress(), 10)
            .expect("recount");
        assert_eq!(recount, 20);
    } else {
        // FFmpeg built without an H.264 encoder.
        assert_eq!(outcome.output_name, "clip.mp4");
    }
}

#[test]
fn garbage_file_fails_to_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.mp4");
    std::fs::write(&path, b"this is not a video").expect("write");
    framecount::set_ffmpeg_verbosity(FfmpegVerbosity::Quiet);

    let error = count_by_decoding(&FfmpegCodec::new(), &path, &progress(), 10).unwrap_err();
    assert!(
        matches!(
            error,
            FrameCountError::FileOpen { .. } | FrameCountError::NoVideoStream { .. }
        ),
        "{error}"
    );
}

#[test]
fn pipeline_counts_generated_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_mp4(&dir.path().join("b.mp4"), 6);
    write_mp4(&dir.path().join("a.mp4"), 4);

    let options = CountOptions::new()
        .with_source_dir(dir.path())
        .with_output_dir(dir.path())
        .with_max_workers(2);
    let report = pipeline::run(&options, &FfmpegCodec::new()).expect("run");

    let csv = std::fs::read_to_string(report.manifest_path).expect("read manifest");
    assert_eq!(csv, "filename,framecount\na.mp4,4\nb.mp4,6\n");
}

#[test]
fn truncated_stream_keeps_frames_decoded_before_the_cut() {
    const FRAMES: u64 = 40;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cut.h264");
    framecount::set_ffmpeg_verbosity(FfmpegVerbosity::Quiet);

    let Ok(mut sink) = FfmpegCodec::new().open_writer(&path, VideoKind::H264Raw, geometry()) else {
        // FFmpeg built without an H.264 encoder.
        return;
    };
    for index in 0..FRAMES {
        sink.write_frame(&noise_frame(index)).expect("write frame");
    }
    sink.finish().expect("finish");
    drop(sink);

    let codec = FfmpegCodec::new();
    assert_eq!(count_by_decoding(&codec, &path, &progress(), 10).expect("decode"), FRAMES);

    let full_length = std::fs::metadata(&path).expect("metadata").len();
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .and_then(|file| file.set_len(full_length / 2))
        .expect("truncate");

    let frames = count_by_decoding(&codec, &path, &progress(), 10).expect("decode truncated");
    assert!(frames > 0 && frames < FRAMES, "decoded {frames} of {FRAMES}");

    let task = WorkerTask {
        source_dir: dir.path().to_path_buf(),
        output_dir: dir.path().to_path_buf(),
        filename: "cut.h264".to_string(),
    };
    let outcome =
        process_task(&codec, &task, &TaskSettings::default(), &progress()).expect("task");
    assert_eq!(outcome.row.filename, "cut.h264");
    assert_eq!(outcome.row.framecount, frames);
}

// ── Fixture ────────────────────────────────────────────────────────

#[test]
fn sample_video_decode_matches_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let codec = FfmpegCodec::new();
    let decoded = count_by_decoding(&codec, Path::new(path), &progress(), 100).expect("decode");
    let reported = count_from_metadata(&codec, Path::new(path)).expect("metadata");
    assert!(decoded > 0);
    assert_eq!(decoded, reported);
}

#[test]
fn sample_video_reports_geometry() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = FfmpegCodec::new().open(Path::new(path)).expect("open");
    let geometry = framecount::VideoSource::geometry(&source);
    assert!(geometry.width > 0);
    assert!(geometry.height > 0);
    assert!(geometry.frames_per_second > 0.0);
}
