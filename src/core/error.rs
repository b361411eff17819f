//! Error types for FastTileTrack
//!
//! Defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for FastTileTrack operations
#[derive(Debug, Error)]
pub enum TileTrackError {
    /// Coordinate parsing errors
    #[error("Coordinate error: {0}")]
    Coordinate(#[from] CoordinateError),

    /// Genome definition errors
    #[error("Genome error: {0}")]
    Genome(#[from] GenomeError),

    /// Raw data access errors
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while converting coordinate text into a position
///
/// These are never recovered locally: malformed coordinate text means the
/// upstream parser handed over corrupt data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    /// Text is not a valid integer coordinate
    #[error("Invalid integer coordinate '{value}': {message}")]
    InvalidInteger { value: String, message: String },

    /// Text is not a valid genetic map coordinate
    #[error("Invalid numeric coordinate '{value}': {message}")]
    InvalidNumber { value: String, message: String },
}

/// Errors that can occur while building a genome definition
#[derive(Debug, Error)]
pub enum GenomeError {
    /// Malformed line in a chromosome sizes file
    #[error("Invalid chromosome sizes line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    /// The same chromosome name appeared twice
    #[error("Duplicate chromosome: {0}")]
    DuplicateChromosome(String),

    /// Bad genetic map property value
    #[error("Invalid genome property {key}={value}")]
    InvalidProperty { key: String, value: String },

    /// Chromosome length could not be parsed
    #[error("Invalid chromosome length at line {line}: {source}")]
    InvalidLength {
        line: usize,
        #[source]
        source: CoordinateError,
    },

    /// File not found
    #[error("Genome file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error during parsing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while a data source reads raw features
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Malformed input record
    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// Failure reported by an underlying reader (e.g. bigWig)
    #[error("Read failed: {0}")]
    Read(String),

    /// File not found
    #[error("Data file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for FastTileTrack operations
pub type Result<T> = std::result::Result<T, TileTrackError>;

/// Result type alias for coordinate parsing
pub type CoordinateResult<T> = std::result::Result<T, CoordinateError>;

/// Result type alias for genome loading
pub type GenomeResult<T> = std::result::Result<T, GenomeError>;

/// Result type alias for data source access
pub type DataSourceResult<T> = std::result::Result<T, DataSourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_error_display() {
        let err = CoordinateError::InvalidInteger {
            value: "12a".to_string(),
            message: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid integer coordinate '12a': invalid digit found in string"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: TileTrackError = DataSourceError::Read("bad block".to_string()).into();
        assert!(matches!(err, TileTrackError::DataSource(_)));
        assert_eq!(err.to_string(), "Data source error: Read failed: bad block");
    }
}
