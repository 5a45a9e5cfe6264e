//! Directory discovery tests.

use std::fs;

use framecount::{FrameCountError, VideoKind, discover};

#[test]
fn keeps_only_recognized_extensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["b.h264", "a.mp4", "notes.txt", "c.MP4", "d.mkv", "mp4"] {
        fs::write(dir.path().join(name), b"x").expect("write");
    }

    let files = discover(dir.path()).expect("discover");
    let names: Vec<_> = files.iter().map(|file| file.filename.as_str()).collect();
    assert_eq!(names, vec!["a.mp4", "b.h264"]);
    assert_eq!(files[0].kind, VideoKind::Mp4);
    assert_eq!(files[1].kind, VideoKind::H264Raw);
}

#[test]
fn does_not_descend_into_subdirectories() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("nested.mp4")).expect("mkdir");
    fs::create_dir(dir.path().join("inner")).expect("mkdir");
    fs::write(dir.path().join("inner").join("deep.mp4"), b"x").expect("write");
    fs::write(dir.path().join("top.h264"), b"x").expect("write");

    let files = discover(dir.path()).expect("discover");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename, "top.h264");
}

#[test]
fn empty_directory_reports_no_video_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("readme.md"), b"nothing here").expect("write");

    let error = discover(dir.path()).unwrap_err();
    assert!(matches!(error, FrameCountError::NoVideoFiles { .. }), "{error}");
}

#[test]
fn missing_directory_is_a_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("does-not-exist");

    let error = discover(&missing).unwrap_err();
    assert!(matches!(error, FrameCountError::DirectoryRead { .. }), "{error}");
}

#[test]
fn file_path_is_a_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("a.mp4");
    fs::write(&file, b"x").expect("write");

    let error = discover(&file).unwrap_err();
    assert!(matches!(error, FrameCountError::DirectoryRead { .. }), "{error}");
}

#[cfg(unix)]
#[test]
fn follows_symlinks_to_videos() {
    let dir = tempfile::tempdir().expect("tempdir");
    let elsewhere = tempfile::tempdir().expect("tempdir");
    let target = elsewhere.path().join("real.mp4");
    fs::write(&target, b"x").expect("write");
    std::os::unix::fs::symlink(&target, dir.path().join("link.mp4")).expect("symlink");
    std::os::unix::fs::symlink(elsewhere.path().join("gone.mp4"), dir.path().join("dangling.mp4"))
        .expect("symlink");

    let files = discover(dir.path()).expect("discover");
    let names: Vec<_> = files.iter().map(|file| file.filename.as_str()).collect();
    assert_eq!(names, vec!["link.mp4"]);
}
