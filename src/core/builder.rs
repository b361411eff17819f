//! Windowed aggregation of raw features into summary scores
//!
//! The builder walks the features of a [`DataTile`] in start order and
//! produces the scores of one tile span:
//!
//! 1. Features are clipped to the span and mapped to bins of width
//!    `(end - start) / bins`.
//! 2. A feature covering more than one bin is emitted as-is, so wide features
//!    keep their exact extent.
//! 3. Features inside a single bin are folded into an open [`Accumulator`],
//!    which is flushed whenever a feature reaches past the previous bin or a
//!    multi-bin feature arrives.
//!
//! The pass-through window function skips binning and emits every feature.
//!
//! Aggregated scores are disjoint only when the input features are: a wide
//! feature overlapping a later narrow one is emitted as-is next to it.

use crate::core::accumulator::{Accumulator, DEFAULT_SAMPLE_CAPACITY};
use crate::core::{DataTile, Genome, LocusScore, NamedScore, Position, WindowFunction};

/// Bins per tile unless configured otherwise
pub const DEFAULT_BINS_PER_TILE: usize = 700;

/// Converts raw tiles into summary scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBuilder {
    bins: usize,
    sample_capacity: usize,
    min_feature_width: f64,
}

impl Default for TileBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BINS_PER_TILE)
    }
}

impl TileBuilder {
    /// Builder for standard genomes with `bins` bins per tile
    pub fn new(bins: usize) -> Self {
        Self {
            bins: bins.max(1),
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            min_feature_width: 1.0,
        }
    }

    /// Builder matching a genome's feature width rules
    pub fn for_genome(genome: &Genome, bins: usize) -> Self {
        Self::new(bins).with_min_feature_width(genome.min_feature_width())
    }

    pub fn with_sample_capacity(mut self, capacity: usize) -> Self {
        self.sample_capacity = capacity.max(1);
        self
    }

    pub fn with_min_feature_width(mut self, width: f64) -> Self {
        if width > 0.0 && width.is_finite() {
            self.min_feature_width = width;
        }
        self
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn sample_capacity(&self) -> usize {
        self.sample_capacity
    }

    /// Summarize `data` over `[start, end)`
    ///
    /// `data` must be sorted ascending by start; features beginning at or after
    /// `end` stop the scan. Every returned score lies within `[start, end)`.
    /// Aggregating functions return disjoint scores for disjoint features.
    pub fn build(
        &self,
        data: &DataTile,
        start: Position,
        end: Position,
        window_function: WindowFunction,
    ) -> Vec<LocusScore> {
        if data.is_empty() || end <= start {
            return Vec::new();
        }
        if window_function.is_aggregating() {
            self.aggregate(data, start, end, window_function)
        } else {
            self.pass_through(data, start, end)
        }
    }

    /// Feature extent clipped to `[start, end)`, or None when outside
    fn clip(
        &self,
        feature_start: Position,
        feature_end: Option<Position>,
        start: Position,
        end: Position,
    ) -> Option<(Position, Position)> {
        let min_end = Position::from_f64(feature_start.as_f64() + self.min_feature_width);
        let raw_end = match feature_end {
            Some(e) => e.max(min_end),
            None => min_end,
        };

        let s = feature_start.max(start);
        let e = raw_end.min(end);
        if e <= start || e <= s {
            return None;
        }
        Some((s, e))
    }

    fn pass_through(&self, data: &DataTile, start: Position, end: Position) -> Vec<LocusScore> {
        let mut results = Vec::new();
        for feature in data.iter() {
            if feature.start >= end {
                break;
            }
            let Some((s, e)) = self.clip(feature.start, feature.end, start, end) else {
                continue;
            };
            results.push(LocusScore::Named(
                NamedScore::new(s, e, feature.value).with_name(feature.name.map(str::to_string)),
            ));
        }
        results
    }

    fn aggregate(
        &self,
        data: &DataTile,
        start: Position,
        end: Position,
        window_function: WindowFunction,
    ) -> Vec<LocusScore> {
        let origin = start.as_f64();
        let scale = (end.as_f64() - origin) / self.bins as f64;

        let mut results = Vec::new();
        let mut accumulator = Accumulator::with_capacity(window_function, self.sample_capacity);
        let mut accumulated_start = start;
        let mut accumulated_end = start;
        let mut last_end_bin = 0usize;

        for feature in data.iter() {
            if feature.start >= end {
                break;
            }
            if feature.value.is_nan() {
                continue;
            }
            let Some((s, e)) = self.clip(feature.start, feature.end, start, end) else {
                continue;
            };

            let start_bin = self.start_bin(s.as_f64() - origin, scale);
            let end_bin = self.end_bin(e.as_f64() - origin, scale).max(start_bin);

            if (end_bin > last_end_bin || end_bin > start_bin) && accumulator.has_data() {
                results.push(LocusScore::from_accumulator(
                    &accumulator,
                    accumulated_start,
                    accumulated_end,
                ));
                accumulator = Accumulator::with_capacity(window_function, self.sample_capacity);
            }

            if end_bin > start_bin {
                results.push(LocusScore::Named(
                    NamedScore::new(s, e, feature.value)
                        .with_name(feature.name.map(str::to_string)),
                ));
            } else {
                if !accumulator.has_data() {
                    accumulated_start = s;
                }
                accumulated_end = e;
                let length = (e.as_f64() - s.as_f64()).round().max(0.0) as u64;
                accumulator.add(length, feature.value, feature.name);
            }
            last_end_bin = end_bin;
        }

        if accumulator.has_data() {
            results.push(LocusScore::from_accumulator(
                &accumulator,
                accumulated_start,
                accumulated_end,
            ));
        }
        results
    }

    /// Bin holding an offset from the tile start, clamped to `[0, bins]`
    fn start_bin(&self, offset: f64, scale: f64) -> usize {
        self.clamp_bin((offset / scale).floor())
    }

    /// Bin holding the last point covered by a half-open extent ending at
    /// `offset`, clamped to `[0, bins]`
    ///
    /// The last covered point lies one minimum feature width before the end:
    /// the last base for standard genomes, an epsilon for genetic maps.
    fn end_bin(&self, offset: f64, scale: f64) -> usize {
        self.clamp_bin(((offset - self.min_feature_width) / scale).floor())
    }

    fn clamp_bin(&self, bin: f64) -> usize {
        if bin.is_nan() || bin <= 0.0 {
            0
        } else if bin >= self.bins as f64 {
            self.bins
        } else {
            bin as usize
        }
    }
}
