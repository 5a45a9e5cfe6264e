//! Shared result collection.
//!
//! Workers append into a [`ResultAggregator`] by shared reference; the
//! pipeline takes the rows out by value once every worker has returned.

use std::sync::{Mutex, PoisonError};

use crate::error::FrameCountError;
use crate::manifest::{Manifest, ManifestRow};

/// Append-only, mutex-protected collection of manifest rows.
///
/// Rows are kept in arrival order, which is not meaningful.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    rows: Mutex<Vec<ManifestRow>>,
}

impl ResultAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row.
    ///
    /// A lock poisoned by a panicking worker is recovered; rows recorded
    /// before the panic are kept.
    pub fn record(&self, row: ManifestRow) {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        log::debug!("Recorded {} with {} frames", row.filename, row.framecount);
        rows.push(row);
    }

    /// Number of rows recorded so far.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no row has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the rows, in arrival order.
    pub fn into_rows(self) -> Vec<ManifestRow> {
        self.rows
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the rows as a sorted [`Manifest`].
    ///
    /// # Errors
    ///
    /// [`FrameCountError::DuplicateOutput`] if two rows share a filename.
    pub fn into_manifest(self) -> Result<Manifest, FrameCountError> {
        Manifest::from_rows(self.into_rows())
    }
}
