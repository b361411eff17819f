//! Raw and summarized tiles
//!
//! [`DataTile`] holds unaggregated features for one raw-data request and is
//! discarded after the summary is built. [`SummaryTile`] is the cached result
//! covering one tile span.

use crate::core::{LocusScore, Position};

/// Raw features for a chromosome sub-range, sorted ascending by start
///
/// `ends` and `names` are optional because some formats (e.g. fixed-step
/// signal) carry neither.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTile {
    starts: Vec<Position>,
    ends: Option<Vec<Position>>,
    values: Vec<f32>,
    names: Option<Vec<String>>,
}

/// Borrowed view of one feature in a [`DataTile`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature<'a> {
    pub start: Position,
    pub end: Option<Position>,
    pub value: f32,
    pub name: Option<&'a str>,
}

impl DataTile {
    /// Tile from parallel start and value columns
    pub fn new(starts: Vec<Position>, values: Vec<f32>) -> Self {
        debug_assert_eq!(starts.len(), values.len());
        Self {
            starts,
            ends: None,
            values,
            names: None,
        }
    }

    pub fn with_ends(mut self, ends: Vec<Position>) -> Self {
        debug_assert_eq!(ends.len(), self.starts.len());
        self.ends = Some(ends);
        self
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        debug_assert_eq!(names.len(), self.starts.len());
        self.names = Some(names);
        self
    }

    /// Append one feature
    ///
    /// The end and name columns are created on first use; features pushed
    /// earlier get a one-unit end and an empty name.
    pub fn push(&mut self, start: Position, end: Option<Position>, value: f32, name: Option<&str>) {
        if let Some(end) = end {
            let starts = &self.starts;
            self.ends
                .get_or_insert_with(|| starts.iter().map(|s| Position::new(s.base + 1)).collect())
                .push(end);
        } else if let Some(ends) = &mut self.ends {
            ends.push(Position::with_fraction(start.base + 1, start.fraction));
        }

        if let Some(name) = name {
            let len = self.starts.len();
            self.names
                .get_or_insert_with(|| vec![String::new(); len])
                .push(name.to_string());
        } else if let Some(names) = &mut self.names {
            names.push(String::new());
        }

        self.starts.push(start);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.starts.len().min(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn starts(&self) -> &[Position] {
        &self.starts
    }

    pub fn ends(&self) -> Option<&[Position]> {
        self.ends.as_deref()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    pub fn feature(&self, idx: usize) -> Feature<'_> {
        Feature {
            start: self.starts[idx],
            end: self.ends.as_ref().and_then(|e| e.get(idx).copied()),
            value: self.values[idx],
            name: self
                .names
                .as_ref()
                .and_then(|n| n.get(idx))
                .map(String::as_str)
                .filter(|n| !n.is_empty()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature<'_>> + '_ {
        (0..self.len()).map(move |i| self.feature(i))
    }
}

/// Scores covering exactly one tile span `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTile {
    pub start: Position,
    pub end: Position,
    scores: Vec<LocusScore>,
}

impl SummaryTile {
    pub fn new(start: Position, end: Position, scores: Vec<LocusScore>) -> Self {
        Self { start, end, scores }
    }

    pub fn empty(start: Position, end: Position) -> Self {
        Self::new(start, end, Vec::new())
    }

    pub fn scores(&self) -> &[LocusScore] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
