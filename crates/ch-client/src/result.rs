//! Aggregate outcome of one query.

use native_protocol::{ProfileInfo, Progress};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::exception::RemoteError;
use crate::row::Row;

/// Everything the server sent back for one query.
///
/// Row data arrives across zero or more DATA packets, one [`Block`] each.
/// Progress and profile counters hold the last values reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Data blocks in arrival order.
    pub blocks: Vec<Block>,
    /// Totals block (`WITH TOTALS`).
    pub totals: Option<Block>,
    /// Extremes block (`extremes = 1`).
    pub extremes: Option<Block>,
    /// Exception that ended the query.
    pub exception: Option<RemoteError>,
    /// Last progress report.
    pub progress: Progress,
    /// Last profile info report.
    pub profile: ProfileInfo,
}

impl QueryResult {
    /// Create an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the server ended the query with an exception.
    #[must_use]
    pub fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// Iterate rows of every data block, in order.
    ///
    /// Totals and extremes are not included.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.blocks.iter().flat_map(Block::rows)
    }

    /// Total rows across data blocks.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.blocks.iter().map(Block::row_count).sum()
    }

    /// Take the rows of every data block, in order.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.blocks.into_iter().flat_map(Block::into_rows).collect()
    }

    /// Fail with the stored exception, if any.
    pub fn into_result(mut self) -> Result<Self> {
        match self.exception.take() {
            Some(exception) => Err(Error::Remote(exception)),
            None => Ok(self),
        }
    }
}
