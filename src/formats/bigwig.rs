//! BigWig data source
//!
//! Raw intervals come from the file's data section. When the file carries a
//! zoom level fine enough for the requested resolution, mean/min/max summaries
//! are answered straight from that level and bypass tiling.

use crate::core::{
    normalize_chrom, DataSource, DataSourceError, DataSourceResult, DataTile, LocusScore,
    NamedScore, Position, WindowFunction, DEFAULT_BINS_PER_TILE, MAX_ZOOM,
};
use bigtools::{BigWigRead, Summary};
use log::debug;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// [`DataSource`] over a bigWig file
///
/// The file is reopened per request so the source stays `Sync` without
/// serializing readers behind a lock.
pub struct BigWigDataSource {
    path: String,
    /// Chromosome -> length
    chroms: HashMap<String, u32>,
    /// Normalized chromosome name -> stored name
    chrom_aliases: HashMap<String, String>,
    /// Available zoom reductions in bases per record
    zoom_levels: Vec<u32>,
    bins_per_tile: usize,
    /// Longest feature per chromosome, filled on first use
    longest: RwLock<HashMap<String, i64>>,
}

impl BigWigDataSource {
    /// Open a bigWig file and read its header
    pub fn open(path: &Path) -> DataSourceResult<Self> {
        if !path.exists() {
            return Err(DataSourceError::FileNotFound(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| DataSourceError::Read(format!("non UTF-8 path: {}", path.display())))?
            .to_string();

        let reader = BigWigRead::open_file(&path_str).map_err(read_error)?;
        let chroms: HashMap<String, u32> = reader
            .chroms()
            .iter()
            .map(|c| (c.name.clone(), c.length))
            .collect();
        let chrom_aliases = chroms
            .keys()
            .map(|name| (normalize_chrom(name), name.clone()))
            .collect();
        let mut zoom_levels: Vec<u32> = reader
            .info()
            .zoom_headers
            .iter()
            .map(|z| z.reduction_level)
            .collect();
        zoom_levels.sort_unstable();

        debug!(
            "opened {} with {} chromosomes and zoom levels {:?}",
            path.display(),
            chroms.len(),
            zoom_levels
        );

        Ok(Self {
            path: path_str,
            chroms,
            chrom_aliases,
            zoom_levels,
            bins_per_tile: DEFAULT_BINS_PER_TILE,
            longest: RwLock::new(HashMap::new()),
        })
    }

    /// Bins per tile used to pick a zoom level; match the selector's setting
    pub fn with_bins_per_tile(mut self, bins: usize) -> Self {
        self.bins_per_tile = bins.max(1);
        self
    }

    /// Chromosome names and lengths from the file header
    pub fn chromosomes(&self) -> impl Iterator<Item = (&str, u32)> {
        self.chroms.iter().map(|(name, len)| (name.as_str(), *len))
    }

    pub fn zoom_levels(&self) -> &[u32] {
        &self.zoom_levels
    }

    fn resolve<'a>(&'a self, chr: &'a str) -> Option<(&'a str, u32)> {
        if let Some((name, len)) = self.chroms.get_key_value(chr) {
            return Some((name.as_str(), *len));
        }
        let name = self.chrom_aliases.get(&normalize_chrom(chr))?;
        self.chroms.get(name).map(|len| (name.as_str(), *len))
    }

    fn scan_longest(&self, chr: &str, length: u32) -> DataSourceResult<i64> {
        let mut reader = BigWigRead::open_file(&self.path).map_err(read_error)?;
        let mut longest = 0i64;
        for value in reader.get_interval(chr, 0, length).map_err(read_error)? {
            let value = value.map_err(read_error)?;
            longest = longest.max(value.end as i64 - value.start as i64);
        }
        Ok(longest)
    }
}

impl DataSource for BigWigDataSource {
    fn raw_data(&self, chr: &str, start: i64, end: i64) -> DataSourceResult<Option<DataTile>> {
        let Some((name, length)) = self.resolve(chr) else {
            return Ok(None);
        };
        let start = start.clamp(0, length as i64) as u32;
        let end = end.clamp(0, length as i64) as u32;
        if end <= start {
            return Ok(None);
        }

        let mut reader = BigWigRead::open_file(&self.path).map_err(read_error)?;
        let mut tile = DataTile::default();
        for value in reader.get_interval(name, start, end).map_err(read_error)? {
            let value = value.map_err(read_error)?;
            tile.push(
                Position::from(value.start as u64),
                Some(Position::from(value.end as u64)),
                value.value,
                None,
            );
        }
        Ok(if tile.is_empty() { None } else { Some(tile) })
    }

    /// Scans the chromosome once and remembers the result; unreadable
    /// chromosomes fall back to their full length.
    fn longest_feature(&self, chr: &str) -> i64 {
        let Some((name, length)) = self.resolve(chr) else {
            return 0;
        };
        if let Some(&known) = self
            .longest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return known;
        }

        let longest = self.scan_longest(name, length).unwrap_or_else(|e| {
            debug!("longest feature scan failed for {}: {}", name, e);
            length as i64
        });
        self.longest
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), longest);
        longest
    }

    fn precomputed_summary_scores(
        &self,
        chr: &str,
        start: i64,
        end: i64,
        zoom: u32,
        window_function: WindowFunction,
    ) -> DataSourceResult<Option<Vec<LocusScore>>> {
        if !matches!(
            window_function,
            WindowFunction::Mean | WindowFunction::Min | WindowFunction::Max
        ) {
            return Ok(None);
        }
        let Some((name, length)) = self.resolve(chr) else {
            return Ok(None);
        };

        let tiles = (1u64 << zoom.min(MAX_ZOOM)) as f64;
        let bases_per_bin = length as f64 / tiles / self.bins_per_tile as f64;
        let Some(reduction) = select_zoom_level(&self.zoom_levels, bases_per_bin) else {
            return Ok(None);
        };

        let start = start.clamp(0, length as i64) as u32;
        let end = end.clamp(0, length as i64) as u32;
        if end <= start {
            return Ok(Some(Vec::new()));
        }

        let mut reader = BigWigRead::open_file(&self.path).map_err(read_error)?;
        let mut scores = Vec::new();
        for record in reader
            .get_zoom_interval(name, start, end, reduction)
            .map_err(read_error)?
        {
            let record = record.map_err(read_error)?;
            if let Some(value) = summary_value(&record.summary, window_function) {
                scores.push(LocusScore::Named(NamedScore::new(
                    Position::from(record.start as u64),
                    Position::from(record.end as u64),
                    value,
                )));
            }
        }
        debug!(
            "{} zoom records for {}:{}-{} at reduction {}",
            scores.len(),
            name,
            start,
            end,
            reduction
        );
        Ok(Some(scores))
    }
}

fn read_error(e: impl std::fmt::Display) -> DataSourceError {
    DataSourceError::Read(e.to_string())
}

/// Coarsest zoom reduction that still resolves one bin
fn select_zoom_level(levels: &[u32], bases_per_bin: f64) -> Option<u32> {
    levels
        .iter()
        .copied()
        .filter(|&level| level as f64 <= bases_per_bin)
        .max()
}

/// Value of a zoom record under a window function, None when it covers no data
fn summary_value(summary: &Summary, window_function: WindowFunction) -> Option<f32> {
    if summary.bases_covered == 0 {
        return None;
    }
    match window_function {
        WindowFunction::Mean => Some((summary.sum / summary.bases_covered as f64) as f32),
        WindowFunction::Min => Some(summary.min_val as f32),
        WindowFunction::Max => Some(summary.max_val as f32),
        _ => None,
    }
}
