//! In-memory interval data source
//!
//! Features are indexed per chromosome with rust-lapper for O(log n + k)
//! overlap queries. Loading from wiggle or bedGraph files goes through
//! [`WigReader`]; compressed inputs are detected automatically.

use crate::core::{
    normalize_chrom, open_input, DataSource, DataSourceError, DataSourceResult, DataTile, Genome,
    Position,
};
use crate::formats::wig::{WigDataPoint, WigParseError, WigReader};
use log::{debug, warn};
use rust_lapper::{Interval, Lapper};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// Feature stored per interval slot
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalValue {
    pub start: Position,
    pub end: Position,
    pub value: f32,
    pub name: Option<String>,
}

/// Interval keyed by its slot in the chromosome's value table
type SlotInterval = Interval<u64, usize>;

/// Interval tree and feature table for one chromosome
struct ChromIndex {
    lapper: Lapper<u64, usize>,
    values: Vec<IntervalValue>,
    /// Longest feature, rounded up to whole units
    longest: i64,
}

impl Default for ChromIndex {
    fn default() -> Self {
        Self {
            lapper: Lapper::new(Vec::new()),
            values: Vec::new(),
            longest: 0,
        }
    }
}

impl ChromIndex {
    fn from_values(values: Vec<IntervalValue>) -> Self {
        let intervals: Vec<SlotInterval> = values
            .iter()
            .enumerate()
            .map(|(slot, val)| slot_interval(slot, val))
            .collect();
        let longest = values.iter().map(extent).max().unwrap_or(0);
        Self {
            lapper: Lapper::new(intervals),
            values,
            longest,
        }
    }

    fn insert(&mut self, val: IntervalValue) {
        let slot = self.values.len();
        self.lapper.insert(slot_interval(slot, &val));
        self.longest = self.longest.max(extent(&val));
        self.values.push(val);
    }
}

fn slot_interval(slot: usize, val: &IntervalValue) -> SlotInterval {
    let lo = val.start.base.max(0) as u64;
    let hi = (val.end.ceil().max(0) as u64).max(lo + 1);
    Interval {
        start: lo,
        stop: hi,
        val: slot,
    }
}

fn extent(val: &IntervalValue) -> i64 {
    (val.end.as_f64() - val.start.as_f64()).ceil().max(0.0) as i64
}

/// Per-chromosome interval index implementing [`DataSource`]
#[derive(Default)]
pub struct IntervalDataSource {
    /// Chromosome -> interval tree and features
    maps: HashMap<String, ChromIndex>,
    /// Normalized chromosome name -> stored name
    chrom_aliases: HashMap<String, String>,
}

impl IntervalDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from wiggle/bedGraph data points in integer coordinates
    ///
    /// With a genetic map genome the coordinates are treated as pre-scaled
    /// text values and converted through the genome's coordinate model.
    pub fn from_points<I>(points: I, genome: Option<&Genome>) -> Self
    where
        I: IntoIterator<Item = WigDataPoint>,
    {
        let mut by_chrom: HashMap<String, Vec<IntervalValue>> = HashMap::new();
        for point in points {
            let (start, end) = match genome {
                Some(g) if g.is_genetic_map() => (
                    g.scale_coordinate(point.start as f64),
                    g.scale_coordinate(point.end as f64),
                ),
                _ => (Position::from(point.start), Position::from(point.end)),
            };
            by_chrom.entry(point.chrom).or_default().push(IntervalValue {
                start,
                end,
                value: point.value,
                name: point.name,
            });
        }

        let mut source = Self::new();
        for (chrom, values) in by_chrom {
            source.chrom_aliases.insert(normalize_chrom(&chrom), chrom.clone());
            source.maps.insert(chrom, ChromIndex::from_values(values));
        }
        source
    }

    /// Load a wiggle or bedGraph file, optionally gzip/bzip2 compressed
    ///
    /// Malformed records are logged and skipped; I/O failures abort the load.
    pub fn from_wig_file(path: &Path, genome: Option<&Genome>) -> DataSourceResult<Self> {
        if !path.exists() {
            return Err(DataSourceError::FileNotFound(path.to_path_buf()));
        }
        let reader = WigReader::new(open_input(path)?);

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for result in reader {
            match result {
                Ok(point) => points.push(point),
                Err(WigParseError::IoError(msg)) => return Err(DataSourceError::Read(msg)),
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    skipped += 1;
                }
            }
        }
        debug!(
            "loaded {} data points from {} ({} skipped)",
            points.len(),
            path.display(),
            skipped
        );
        Ok(Self::from_points(points, genome))
    }

    /// Add one feature
    ///
    /// Each insert re-sorts the chromosome's index; use [`Self::from_points`]
    /// for bulk loading.
    pub fn add(&mut self, chr: &str, start: i64, end: i64, value: f32, name: Option<&str>) {
        let start = start.max(0);
        self.chrom_aliases
            .entry(normalize_chrom(chr))
            .or_insert_with(|| chr.to_string());
        self.maps.entry(chr.to_string()).or_default().insert(IntervalValue {
            start: Position::new(start),
            end: Position::new(end.max(start)),
            value,
            name: name.map(str::to_string),
        });
    }

    /// Chromosomes with at least one feature
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    /// Total number of features
    pub fn len(&self) -> usize {
        self.maps.values().map(|c| c.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the index for a chromosome, trying different naming styles
    fn find_index(&self, chrom: &str) -> Option<&ChromIndex> {
        if let Some(index) = self.maps.get(chrom) {
            return Some(index);
        }
        let original = self.chrom_aliases.get(&normalize_chrom(chrom))?;
        self.maps.get(original)
    }
}

impl DataSource for IntervalDataSource {
    fn raw_data(&self, chr: &str, start: i64, end: i64) -> DataSourceResult<Option<DataTile>> {
        let Some(index) = self.find_index(chr) else {
            return Ok(None);
        };
        let start = start.max(0);
        if end <= start {
            return Ok(None);
        }

        let mut hits: Vec<&IntervalValue> = index
            .lapper
            .find(start as u64, end as u64)
            .filter_map(|iv| index.values.get(iv.val))
            .collect();
        if hits.is_empty() {
            return Ok(None);
        }
        hits.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

        let mut tile = DataTile::new(
            hits.iter().map(|v| v.start).collect(),
            hits.iter().map(|v| v.value).collect(),
        )
        .with_ends(hits.iter().map(|v| v.end).collect());
        if hits.iter().any(|v| v.name.is_some()) {
            tile = tile.with_names(
                hits.iter()
                    .map(|v| v.name.clone().unwrap_or_default())
                    .collect(),
            );
        }
        Ok(Some(tile))
    }

    fn longest_feature(&self, chr: &str) -> i64 {
        self.find_index(chr).map(|index| index.longest).unwrap_or(0)
    }
}
