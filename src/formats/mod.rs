//! File format adapters
//!
//! Data sources for different score track formats (Wiggle/bedGraph, BigWig)
//! and the bedGraph writer used for exports.

pub mod bigwig;
pub mod interval;
pub mod wig;

pub use bigwig::BigWigDataSource;
pub use interval::{IntervalDataSource, IntervalValue};
pub use wig::{
    write_bedgraph, BedGraphRecord, WigDataPoint, WigDeclaration, WigFormat, WigParseError,
    WigReader,
};
