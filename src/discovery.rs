//! Candidate file discovery.
//!
//! Lists the immediate entries of one directory and keeps regular files
//! whose names end in a recognized [`VideoKind`](crate::VideoKind)
//! extension. Subdirectories are not descended into.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::FrameCountError;
use crate::kind::VideoFile;

/// Enumerate the video files directly inside `directory`.
///
/// Symlinks are followed, so a link to a video counts as a video. The
/// result is sorted by filename for readable logs; callers must not depend
/// on the order.
///
/// # Errors
///
/// - [`FrameCountError::DirectoryRead`] if `directory` is missing, is not a
///   directory, or cannot be listed.
/// - [`FrameCountError::NoVideoFiles`] if no entry has a recognized
///   extension.
pub fn discover(directory: &Path) -> Result<Vec<VideoFile>, FrameCountError> {
    let directory_read = |reason: String| FrameCountError::DirectoryRead {
        path: directory.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(directory).map_err(|error| directory_read(error.to_string()))?;
    if !metadata.is_dir() {
        return Err(directory_read("not a directory".to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            // A dangling link is skipped; anything else means the listing failed.
            Err(error) if error.depth() > 0 => {
                log::debug!("Skipping unreadable entry: {error}");
                continue;
            }
            Err(error) => return Err(directory_read(error.to_string())),
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(filename) = entry.file_name().to_str() else {
            log::warn!(
                "Skipping non UTF-8 filename {}",
                entry.path().display()
            );
            continue;
        };

        if let Some(file) = VideoFile::from_filename(filename) {
            files.push(file);
        }
    }

    if files.is_empty() {
        return Err(FrameCountError::NoVideoFiles {
            directory: directory.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    log::info!(
        "Found {} video files in {}",
        files.len(),
        directory.display()
    );
    Ok(files)
}
