//! The persisted manifest.
//!
//! A [`Manifest`] is the sorted, duplicate-free list of
//! `(filename, framecount)` rows. It is written as CSV with a
//! `filename,framecount` header, `\n` line endings, and no index column.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FrameCountError;

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestRow {
    /// Output filename (the converted name when conversion happened).
    pub filename: String,
    /// Number of frames.
    pub framecount: u64,
}

impl ManifestRow {
    /// Create a row.
    pub fn new(filename: impl Into<String>, framecount: u64) -> Self {
        Self {
            filename: filename.into(),
            framecount,
        }
    }
}

/// Rows sorted ascending by filename (byte order), filenames unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Sort `rows` and check that every filename appears once.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::DuplicateOutput`] naming the first repeated
    /// filename.
    pub fn from_rows(mut rows: Vec<ManifestRow>) -> Result<Self, FrameCountError> {
        rows.sort_by(|a, b| a.filename.cmp(&b.filename));

        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.filename.as_str()) {
                return Err(FrameCountError::DuplicateOutput {
                    filename: row.filename.clone(),
                });
            }
        }

        Ok(Self { rows })
    }

    /// The sorted rows.
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the manifest has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV text.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("filename,framecount\n");
        for row in &self.rows {
            csv.push_str(&quote_field(&row.filename));
            csv.push(',');
            csv.push_str(&row.framecount.to_string());
            csv.push('\n');
        }
        csv
    }

    /// Write the CSV to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// [`FrameCountError::ManifestWrite`] if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<(), FrameCountError> {
        fs::write(path, self.to_csv()).map_err(|source| FrameCountError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
