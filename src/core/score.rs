//! Summary score records
//!
//! A [`LocusScore`] is either a single feature ([`NamedScore`]) or several
//! features merged into one bin by a window function ([`CompositeScore`]).

use crate::core::accumulator::Accumulator;
use crate::core::{Position, WindowFunction};
use std::fmt::Write;

/// Score for one source feature or one accumulated sample
#[derive(Debug, Clone, PartialEq)]
pub struct NamedScore {
    pub start: Position,
    pub end: Position,
    pub value: f32,
    pub name: Option<String>,
}

impl NamedScore {
    pub fn new(start: Position, end: Position, value: f32) -> Self {
        Self {
            start,
            end,
            value,
            name: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

/// One feature folded into a composite score
#[derive(Debug, Clone, PartialEq)]
pub struct Constituent {
    pub value: f32,
    pub name: Option<String>,
}

/// Aggregate of several features sharing one bin
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub start: Position,
    pub end: Position,
    pub value: f32,
    pub window_function: WindowFunction,
    /// Retained constituents, at most the accumulator capacity
    pub constituents: Vec<Constituent>,
    /// Features folded in, including ones not retained
    pub feature_count: usize,
}

/// Score returned to consumers
#[derive(Debug, Clone, PartialEq)]
pub enum LocusScore {
    Named(NamedScore),
    Composite(CompositeScore),
}

impl LocusScore {
    /// Convert a flushed accumulator into a score
    ///
    /// A single sample keeps its own value and name; more samples produce a
    /// composite carrying the window function aggregate.
    pub fn from_accumulator(acc: &Accumulator, start: Position, end: Position) -> Self {
        if acc.count() == 1 {
            if let Some(sample) = acc.samples().first() {
                return LocusScore::Named(NamedScore {
                    start,
                    end,
                    value: sample.value,
                    name: sample.name.clone(),
                });
            }
        }

        LocusScore::Composite(CompositeScore {
            start,
            end,
            value: acc.value(),
            window_function: acc.window_function(),
            constituents: acc
                .samples()
                .iter()
                .map(|s| Constituent {
                    value: s.value,
                    name: s.name.clone(),
                })
                .collect(),
            feature_count: acc.count(),
        })
    }

    pub fn start(&self) -> Position {
        match self {
            LocusScore::Named(s) => s.start,
            LocusScore::Composite(s) => s.start,
        }
    }

    pub fn end(&self) -> Position {
        match self {
            LocusScore::Named(s) => s.end,
            LocusScore::Composite(s) => s.end,
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            LocusScore::Named(s) => s.value,
            LocusScore::Composite(s) => s.value,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            LocusScore::Named(s) => s.name.as_deref(),
            LocusScore::Composite(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, LocusScore::Composite(_))
    }

    /// Multi-line description for popups and exports
    pub fn display_string(&self) -> String {
        let mut out = String::new();
        match self {
            LocusScore::Named(s) => {
                if let Some(name) = &s.name {
                    let _ = writeln!(out, "{}", name);
                }
                let _ = write!(out, "Value: {} at {}-{}", s.value, s.start, s.end);
            }
            LocusScore::Composite(s) => {
                let _ = write!(
                    out,
                    "Value: {} ({} of {} features) at {}-{}",
                    s.value, s.window_function, s.feature_count, s.start, s.end
                );
                for c in &s.constituents {
                    match &c.name {
                        Some(name) => {
                            let _ = write!(out, "\n  {}: {}", name, c.value);
                        }
                        None => {
                            let _ = write!(out, "\n  {}", c.value);
                        }
                    }
                }
                if s.feature_count > s.constituents.len() {
                    let _ = write!(out, "\n  ...");
                }
            }
        }
        out
    }
}

impl From<NamedScore> for LocusScore {
    fn from(score: NamedScore) -> Self {
        LocusScore::Named(score)
    }
}
