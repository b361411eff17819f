//! FastTileTrack - Cached multi-resolution summaries of genomic score tracks
//!
//! Turns raw per-feature scores (wiggle, bedGraph, bigWig) into a bounded
//! number of summary scores per view, the way a genome browser renders a
//! quantitative track at any zoom level.
//!
//! # Features
//!
//! - Tiles of `2^zoom` per chromosome, each summarized into a fixed number of bins
//! - Window functions: mean, min, max, median, 10th and 90th percentile, or raw
//! - Thread-safe LRU tile cache shared by concurrent queries
//! - Genetic map genomes with sub-integer coordinates
//! - Parallel prefetch and whole-genome export with rayon
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fast_tiletrack::core::{Chromosome, Genome, TileSelector, WindowFunction};
//! use fast_tiletrack::formats::interval::IntervalDataSource;
//!
//! let genome = Arc::new(Genome::new("hg", vec![Chromosome::new("chr1", 7000)]).unwrap());
//! let mut source = IntervalDataSource::new();
//! source.add("chr1", 0, 1, 1.0, None);
//! source.add("chr1", 1, 2, 3.0, None);
//!
//! let selector = TileSelector::new(genome, source);
//! selector.set_window_function(WindowFunction::Mean);
//! let scores = selector.summary_scores_for_range("chr1", 0i64, 7000i64, 0).unwrap();
//! assert_eq!(scores.len(), 1);
//! assert!((scores[0].value() - 2.0).abs() < 1e-6);
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    Chromosome, DataSource, DataTile, Genome, GeneticMap, LocusScore, Position, SummaryTile,
    TileCache, TileConfig, TileSelector, TileTrackError, ViewMode, WindowFunction,
};
pub use formats::{bigwig, interval, wig};
