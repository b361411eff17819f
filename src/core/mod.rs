//! Core tiling and summarization functionality
//!
//! This module contains the coordinate model, the windowed aggregation
//! engine, the tile cache and the range-to-tile selector.

mod accumulator;
mod builder;
mod cache;
mod error;
mod genome;
pub mod io;
mod position;
mod score;
mod selector;
mod source;
mod tile;
mod window;

pub use accumulator::{Accumulator, Sample, DEFAULT_SAMPLE_CAPACITY};
pub use builder::{TileBuilder, DEFAULT_BINS_PER_TILE};
pub use cache::{TileCache, TileKey, DEFAULT_CACHE_CAPACITY};
pub use error::{
    CoordinateError, CoordinateResult, DataSourceError, DataSourceResult, GenomeError,
    GenomeResult, Result, TileTrackError,
};
pub use genome::{
    normalize_chrom, read_properties, Chromosome, DisplayContext, GeneticMap, Genome,
    ALL_CHROMOSOMES, DEFAULT_DECIMAL_PLACES,
};
pub use io::{open_input, Compression, LineIterator};
pub use position::{Position, GENETIC_MAP_EPSILON};
pub use score::{CompositeScore, Constituent, LocusScore, NamedScore};
pub use selector::{TileConfig, TileSelector, TileSpan, ViewMode, MAX_ZOOM};
pub use source::DataSource;
pub use tile::{DataTile, Feature, SummaryTile};
pub use window::WindowFunction;
