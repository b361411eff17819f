//! Raw data access abstraction
//!
//! Anything that can answer "which features overlap this range" implements
//! [`DataSource`]. Implementations must be shareable across threads because a
//! selector serves concurrent queries from one instance.

use crate::core::{DataSourceResult, DataTile, LocusScore, WindowFunction};
use std::sync::Arc;

/// Provider of raw features and optional precomputed summaries
pub trait DataSource: Send + Sync {
    /// Features on `chr` overlapping `[start, end)`, sorted by start
    ///
    /// Returns `Ok(None)` when the source has nothing for the chromosome.
    fn raw_data(&self, chr: &str, start: i64, end: i64) -> DataSourceResult<Option<DataTile>>;

    /// Length of the longest feature on `chr`
    ///
    /// Callers widen raw-data requests to the left by this amount so a wide
    /// feature starting before a tile is still seen by that tile.
    fn longest_feature(&self, chr: &str) -> i64;

    /// Summary scores computed ahead of time (e.g. file zoom levels)
    ///
    /// `Ok(Some(_))` is returned as-is, bypassing tiling and the cache.
    fn precomputed_summary_scores(
        &self,
        _chr: &str,
        _start: i64,
        _end: i64,
        _zoom: u32,
        _window_function: WindowFunction,
    ) -> DataSourceResult<Option<Vec<LocusScore>>> {
        Ok(None)
    }
}

impl<T: DataSource + ?Sized> DataSource for Arc<T> {
    fn raw_data(&self, chr: &str, start: i64, end: i64) -> DataSourceResult<Option<DataTile>> {
        (**self).raw_data(chr, start, end)
    }

    fn longest_feature(&self, chr: &str) -> i64 {
        (**self).longest_feature(chr)
    }

    fn precomputed_summary_scores(
        &self,
        chr: &str,
        start: i64,
        end: i64,
        zoom: u32,
        window_function: WindowFunction,
    ) -> DataSourceResult<Option<Vec<LocusScore>>> {
        (**self).precomputed_summary_scores(chr, start, end, zoom, window_function)
    }
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn raw_data(&self, chr: &str, start: i64, end: i64) -> DataSourceResult<Option<DataTile>> {
        (**self).raw_data(chr, start, end)
    }

    fn longest_feature(&self, chr: &str) -> i64 {
        (**self).longest_feature(chr)
    }

    fn precomputed_summary_scores(
        &self,
        chr: &str,
        start: i64,
        end: i64,
        zoom: u32,
        window_function: WindowFunction,
    ) -> DataSourceResult<Option<Vec<LocusScore>>> {
        (**self).precomputed_summary_scores(chr, start, end, zoom, window_function)
    }
}
