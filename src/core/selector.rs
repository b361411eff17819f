//! Range queries over cached summary tiles
//!
//! A [`TileSelector`] owns one data source, one tile cache and the active
//! window function. Queries map a chromosome range at a zoom level onto tile
//! indices, serve each tile from the cache or build it from raw data, and
//! concatenate the tile scores in order.
//!
//! # Tile arithmetic
//!
//! At zoom `z` a chromosome is split into `2^z` tiles of equal width. For a
//! genetic map the `All` pseudo-chromosome instead uses a fixed tile count per
//! chromosome regardless of zoom. Standard genomes round tile bounds down to
//! whole bases; adjacent tiles always share their boundary. Once tiles are
//! narrower than a base, only one tile per base is non-empty and only those
//! are visited.
//!
//! The `All` view lays the chromosomes end to end in genome order; raw data
//! is fetched per chromosome and shifted by the preceding lengths.

use crate::core::builder::{TileBuilder, DEFAULT_BINS_PER_TILE};
use crate::core::accumulator::DEFAULT_SAMPLE_CAPACITY;
use crate::core::cache::{TileCache, TileKey, DEFAULT_CACHE_CAPACITY};
use crate::core::genome::ALL_CHROMOSOMES;
use crate::core::{
    DataSource, DataTile, Genome, LocusScore, Position, Result, SummaryTile, WindowFunction,
};
use log::{debug, trace};
use rayon::prelude::*;
use std::sync::{Arc, RwLock};

/// Largest zoom whose tile count still fits the index type
pub const MAX_ZOOM: u32 = 62;

/// Tunables for a [`TileSelector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    /// Bins per tile used by the aggregating window functions
    pub bins_per_tile: usize,
    /// Tiles kept in the LRU cache
    pub cache_capacity: usize,
    /// Samples retained per bin for order statistics and composite details
    pub sample_capacity: usize,
    /// Tiles per chromosome for the genetic map `All` view
    pub genetic_map_tiles_per_chromosome: u64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            bins_per_tile: DEFAULT_BINS_PER_TILE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            genetic_map_tiles_per_chromosome: 1,
        }
    }
}

/// How the consumer lays out loci
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Contiguous chromosome view; tiles are cached
    #[default]
    Tiled,
    /// Non-contiguous multi-locus view; each query is one uncached tile
    GeneList,
}

impl ViewMode {
    /// Parse from string (for CLI argument)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tiled" | "chromosome" => Some(ViewMode::Tiled),
            "gene-list" | "genelist" | "gene_list" => Some(ViewMode::GeneList),
            _ => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ViewMode::Tiled)
    }
}

/// Span of one tile on a chromosome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSpan {
    pub index: u64,
    pub start: Position,
    pub end: Position,
}

/// Serves summary scores for chromosome ranges
pub struct TileSelector<S: DataSource> {
    genome: Arc<Genome>,
    source: S,
    cache: TileCache,
    builder: TileBuilder,
    config: TileConfig,
    window_function: RwLock<WindowFunction>,
    view_mode: RwLock<ViewMode>,
}

impl<S: DataSource> TileSelector<S> {
    pub fn new(genome: Arc<Genome>, source: S) -> Self {
        Self::with_config(genome, source, TileConfig::default())
    }

    pub fn with_config(genome: Arc<Genome>, source: S, config: TileConfig) -> Self {
        let builder = TileBuilder::for_genome(&genome, config.bins_per_tile)
            .with_sample_capacity(config.sample_capacity);
        Self {
            cache: TileCache::new(config.cache_capacity),
            genome,
            source,
            builder,
            config,
            window_function: RwLock::new(WindowFunction::default()),
            view_mode: RwLock::new(ViewMode::default()),
        }
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    pub fn window_function(&self) -> WindowFunction {
        *self.window_function.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch the active window function
    ///
    /// A change drops every cached tile. Queries already running on other
    /// threads finish with the function they started with and may still
    /// insert tiles keyed by the old function; those keys are never read
    /// under the new one.
    pub fn set_window_function(&self, window_function: WindowFunction) {
        let mut current = self.window_function.write().unwrap_or_else(|e| e.into_inner());
        if *current != window_function {
            debug!("window function {} -> {}", *current, window_function);
            *current = window_function;
            self.cache.clear();
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        *self.view_mode.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_view_mode(&self, view_mode: ViewMode) {
        *self.view_mode.write().unwrap_or_else(|e| e.into_inner()) = view_mode;
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Scores for `[start, end)` on `chr` at `zoom`, ordered by start
    ///
    /// Whole tiles are returned, so scores may extend past the requested
    /// range up to the surrounding tile bounds. Unknown chromosomes and empty
    /// ranges give an empty result.
    pub fn summary_scores_for_range(
        &self,
        chr: &str,
        start: impl Into<Position>,
        end: impl Into<Position>,
        zoom: u32,
    ) -> Result<Vec<LocusScore>> {
        let (start, end) = (start.into(), end.into());
        let window_function = self.window_function();
        let chr = self.genome.canonical_name(chr);

        if let Some(scores) = self.source.precomputed_summary_scores(
            chr,
            start.base,
            end.ceil(),
            zoom,
            window_function,
        )? {
            trace!("{} precomputed scores for {}:{}-{}", scores.len(), chr, start, end);
            return Ok(scores);
        }

        let chr_length = self.genome.chromosome_length(chr);
        if chr_length == 0 {
            return Ok(Vec::new());
        }
        let start = start.max(Position::ZERO);
        let end = end.min(Position::from(chr_length));
        if end <= start {
            return Ok(Vec::new());
        }

        if !self.view_mode().is_cached() {
            let tile = self.build_tile(chr, start, end, window_function)?;
            return Ok(tile.scores().to_vec());
        }

        let mut scores = Vec::new();
        for span in self.spans(chr, chr_length, start, end, zoom) {
            let tile = self.cached_tile(chr, zoom, &span, window_function)?;
            scores.extend_from_slice(tile.scores());
        }
        Ok(scores)
    }

    /// Tiles a query over `[start, end)` on `chr` at `zoom` would touch
    pub fn tile_spans(
        &self,
        chr: &str,
        start: impl Into<Position>,
        end: impl Into<Position>,
        zoom: u32,
    ) -> Vec<TileSpan> {
        let chr = self.genome.canonical_name(chr);
        let chr_length = self.genome.chromosome_length(chr);
        if chr_length == 0 {
            return Vec::new();
        }
        let start = start.into().max(Position::ZERO);
        let end = end.into().min(Position::from(chr_length));
        if end <= start {
            return Vec::new();
        }
        self.spans(chr, chr_length, start, end, zoom)
    }

    /// Number of tiles covering `chr` at `zoom`
    pub fn tile_count(&self, chr: &str, zoom: u32) -> u64 {
        if chr == ALL_CHROMOSOMES && self.genome.is_genetic_map() {
            (self.genome.chromosome_count() as u64)
                .saturating_mul(self.config.genetic_map_tiles_per_chromosome)
                .max(1)
        } else {
            1u64 << zoom.min(MAX_ZOOM)
        }
    }

    /// Build and cache the tiles of many regions on the rayon pool
    ///
    /// Returns the number of tiles now available in the cache for these
    /// regions, which is bounded by the cache capacity. Does nothing in
    /// gene-list mode.
    pub fn prefetch(&self, regions: &[(String, i64, i64)], zoom: u32) -> Result<usize> {
        if !self.view_mode().is_cached() {
            return Ok(0);
        }
        let window_function = self.window_function();

        let work: Vec<(&str, TileSpan)> = regions
            .iter()
            .flat_map(|(chr, start, end)| {
                let chr = self.genome.canonical_name(chr);
                self.tile_spans(chr, *start, *end, zoom)
                    .into_iter()
                    .map(move |span| (chr, span))
            })
            .collect();
        debug!("prefetching {} tiles at zoom {}", work.len(), zoom);

        work.par_iter()
            .try_for_each(|(chr, span)| {
                self.cached_tile(chr, zoom, span, window_function).map(|_| ())
            })?;
        Ok(work.len().min(self.cache.capacity()))
    }

    /// Scores for every chromosome at `zoom`, computed in parallel
    pub fn export(&self, zoom: u32) -> Result<Vec<(String, Vec<LocusScore>)>> {
        let chromosomes: Vec<(&str, u64)> = self
            .genome
            .chromosomes()
            .iter()
            .map(|c| (c.name.as_str(), c.length))
            .collect();

        chromosomes
            .par_iter()
            .map(|(name, length)| -> Result<(String, Vec<LocusScore>)> {
                let scores = self.summary_scores_for_range(name, 0i64, *length, zoom)?;
                Ok((name.to_string(), scores))
            })
            .collect()
    }

    fn spans(
        &self,
        chr: &str,
        chr_length: u64,
        start: Position,
        end: Position,
        zoom: u32,
    ) -> Vec<TileSpan> {
        let n_tiles = self.tile_count(chr, zoom);
        if self.genome.is_genetic_map() {
            return self.fractional_spans(n_tiles, chr_length, start, end);
        }

        let (length, n) = (chr_length as u128, n_tiles as u128);
        let first_base = start.base.max(0) as u128;
        let end_base = (end.ceil().max(0) as u128).min(length);

        if n > length {
            // Tiles narrower than a base: only the last tile starting at each
            // base is non-empty, so walk bases instead of tile indices.
            return (first_base..end_base)
                .map(|b| (((b + 1) * n).div_ceil(length) - 1) as u64)
                .map(|index| self.base_span(index, n_tiles, chr_length))
                .filter(|span| span.end > start && span.start < end)
                .collect();
        }

        let first = (first_base * n / length) as u64;
        let last = ((end_base * n).div_ceil(length) as u64).min(n_tiles);
        (first..last)
            .map(|index| self.base_span(index, n_tiles, chr_length))
            .filter(|span| span.end > span.start && span.end > start && span.start < end)
            .collect()
    }

    /// Span of tile `index` on a standard genome, bounds rounded down to bases
    fn base_span(&self, index: u64, n_tiles: u64, chr_length: u64) -> TileSpan {
        let bound = |k: u64| (k as u128 * chr_length as u128 / n_tiles as u128) as i64;
        let end = if index + 1 >= n_tiles {
            chr_length as i64
        } else {
            bound(index + 1)
        };
        TileSpan {
            index,
            start: Position::new(bound(index)),
            end: Position::new(end),
        }
    }

    fn fractional_spans(
        &self,
        n_tiles: u64,
        chr_length: u64,
        start: Position,
        end: Position,
    ) -> Vec<TileSpan> {
        let length = chr_length as f64;
        let width = length / n_tiles as f64;

        // Widen by one tile either way, then keep exact overlaps; float tile
        // bounds can shift a boundary away from `k * width`.
        let first = ((start.as_f64() / width).floor() as u64).saturating_sub(1);
        let last = ((end.as_f64() / width).ceil() as u64)
            .saturating_add(1)
            .min(n_tiles);

        (first..last)
            .map(|index| {
                let raw_end = if index + 1 >= n_tiles {
                    length
                } else {
                    ((index + 1) as f64 * width).min(length)
                };
                TileSpan {
                    index,
                    start: Position::from_f64(index as f64 * width),
                    end: Position::from_f64(raw_end),
                }
            })
            .filter(|span| span.end > span.start && span.end > start && span.start < end)
            .collect()
    }

    fn cached_tile(
        &self,
        chr: &str,
        zoom: u32,
        span: &TileSpan,
        window_function: WindowFunction,
    ) -> Result<Arc<SummaryTile>> {
        let key = TileKey::new(chr, zoom, span.index, window_function);
        if let Some(tile) = self.cache.get(&key) {
            return Ok(tile);
        }

        let tile = Arc::new(self.build_tile(chr, span.start, span.end, window_function)?);
        self.cache.put(key, Arc::clone(&tile));
        Ok(tile)
    }

    fn build_tile(
        &self,
        chr: &str,
        start: Position,
        end: Position,
        window_function: WindowFunction,
    ) -> Result<SummaryTile> {
        let data = if chr == ALL_CHROMOSOMES {
            self.genome_wide_data(start, end)?
        } else {
            let longest = self.source.longest_feature(chr).max(0);
            let raw_start = start.base.saturating_sub(longest).max(0);
            self.source.raw_data(chr, raw_start, end.ceil())?
        };

        let scores = match data {
            Some(data) => self.builder.build(&data, start, end, window_function),
            None => Vec::new(),
        };
        trace!(
            "built tile {}:{}-{} ({}) with {} scores",
            chr,
            start,
            end,
            window_function,
            scores.len()
        );
        Ok(SummaryTile::new(start, end, scores))
    }

    /// Raw features of every chromosome overlapping `[start, end)` of the
    /// `All` view, shifted by the lengths of the chromosomes before them
    fn genome_wide_data(&self, start: Position, end: Position) -> Result<Option<DataTile>> {
        let mut combined = DataTile::default();
        let mut offset = 0i64;

        for chromosome in self.genome.chromosomes() {
            let length = chromosome.length as i64;
            let chr_offset = offset;
            offset += length;
            if chr_offset >= end.ceil() {
                break;
            }

            let longest = self.source.longest_feature(&chromosome.name).max(0);
            let local_start = (start.base - chr_offset).saturating_sub(longest).max(0);
            let local_end = (end.ceil() - chr_offset).min(length);
            if local_end <= local_start {
                continue;
            }

            let Some(data) = self.source.raw_data(&chromosome.name, local_start, local_end)? else {
                continue;
            };
            let shift = |p: Position| Position::with_fraction(p.base + chr_offset, p.fraction);
            for feature in data.iter() {
                combined.push(
                    shift(feature.start),
                    feature.end.map(shift),
                    feature.value,
                    feature.name,
                );
            }
        }

        Ok(if combined.is_empty() { None } else { Some(combined) })
    }
}
