//! Wiggle/bedGraph format adapter
//!
//! Reads Wiggle (variableStep, fixedStep) and bedGraph records as data points
//! for in-memory data sources, and writes summary scores back out as bedGraph.

use crate::core::{LocusScore, Position};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Wiggle parsing error
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WigParseError {
    #[error("Invalid format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("Invalid number at line {line}: {value}")]
    InvalidNumber { line: usize, value: String },

    #[error("Missing chrom parameter")]
    MissingChrom,

    #[error("Missing start parameter")]
    MissingStart,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Wiggle format type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WigFormat {
    VariableStep,
    FixedStep,
}

/// Wiggle declaration line parameters
#[derive(Debug, Clone)]
pub struct WigDeclaration {
    pub format: WigFormat,
    pub chrom: String,
    pub span: u64,
    pub start: Option<u64>, // Only for fixedStep
    pub step: Option<u64>,  // Only for fixedStep
}

impl WigDeclaration {
    /// Parse a declaration line (variableStep or fixedStep)
    pub fn parse(line: &str) -> Result<Self, WigParseError> {
        Self::parse_at(line, 0)
    }

    fn parse_at(line: &str, line_number: usize) -> Result<Self, WigParseError> {
        let line = line.trim();

        let (format, rest) = if let Some(rest) = line.strip_prefix("variableStep") {
            (WigFormat::VariableStep, rest)
        } else if let Some(rest) = line.strip_prefix("fixedStep") {
            (WigFormat::FixedStep, rest)
        } else {
            return Err(WigParseError::InvalidFormat {
                line: line_number,
                message: "Expected variableStep or fixedStep".to_string(),
            });
        };

        let number = |value: &str| -> Result<u64, WigParseError> {
            value.parse().map_err(|_| WigParseError::InvalidNumber {
                line: line_number,
                value: value.to_string(),
            })
        };

        let mut chrom = None;
        let mut span = 1u64;
        let mut start = None;
        let mut step = None;

        for part in rest.split_whitespace() {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "chrom" => chrom = Some(value.to_string()),
                    "span" => span = number(value)?.max(1),
                    "start" => start = Some(number(value)?),
                    "step" => step = Some(number(value)?),
                    _ => {} // Ignore unknown parameters
                }
            }
        }

        let chrom = chrom.ok_or(WigParseError::MissingChrom)?;
        if format == WigFormat::FixedStep && start.is_none() {
            return Err(WigParseError::MissingStart);
        }

        Ok(Self {
            format,
            chrom,
            span,
            start,
            step,
        })
    }
}

/// A single Wiggle or bedGraph data point
#[derive(Debug, Clone, PartialEq)]
pub struct WigDataPoint {
    pub chrom: String,
    pub start: u64, // 0-based
    pub end: u64,   // 0-based, exclusive
    pub value: f32,
    /// Optional fifth bedGraph column
    pub name: Option<String>,
}

/// bedGraph line for one summary score
#[derive(Debug, Clone, PartialEq)]
pub struct BedGraphRecord {
    pub chrom: String,
    pub start: Position,
    pub end: Position,
    pub value: f32,
    pub name: Option<String>,
}

impl BedGraphRecord {
    pub fn from_score(chrom: &str, score: &LocusScore) -> Self {
        Self {
            chrom: chrom.to_string(),
            start: score.start(),
            end: score.end(),
            value: score.value(),
            name: score.name().map(str::to_string),
        }
    }

    /// Format as bedGraph line
    pub fn to_line(&self) -> String {
        match &self.name {
            Some(name) => format!(
                "{}\t{}\t{}\t{}\t{}",
                self.chrom, self.start, self.end, self.value, name
            ),
            None => format!("{}\t{}\t{}\t{}", self.chrom, self.start, self.end, self.value),
        }
    }
}

/// Write scores of one chromosome as bedGraph lines, skipping NaN values
pub fn write_bedgraph<W: Write>(
    writer: &mut W,
    chrom: &str,
    scores: &[LocusScore],
) -> io::Result<usize> {
    let mut written = 0;
    for score in scores.iter().filter(|s| !s.value().is_nan()) {
        writeln!(writer, "{}", BedGraphRecord::from_score(chrom, score).to_line())?;
        written += 1;
    }
    Ok(written)
}

/// Parse a Wiggle or bedGraph stream and yield data points
pub struct WigReader<R: BufRead> {
    reader: R,
    current_decl: Option<WigDeclaration>,
    current_pos: u64, // For fixedStep
    line_buffer: String,
    line_number: usize,
}

impl<R: BufRead> WigReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            current_decl: None,
            current_pos: 0,
            line_buffer: String::with_capacity(256),
            line_number: 0,
        }
    }

    /// 1-based number of the last line read
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn invalid_number(&self, value: &str) -> WigParseError {
        WigParseError::InvalidNumber {
            line: self.line_number,
            value: value.to_string(),
        }
    }

    /// Four or five column bedGraph line, or None when the line is not one
    fn parse_bedgraph(parts: &[&str]) -> Option<WigDataPoint> {
        if parts.len() < 4 {
            return None;
        }
        match (
            parts[1].parse::<u64>(),
            parts[2].parse::<u64>(),
            parts[3].parse::<f32>(),
        ) {
            (Ok(start), Ok(end), Ok(value)) => Some(WigDataPoint {
                chrom: parts[0].to_string(),
                start,
                end,
                value,
                name: parts.get(4).map(|n| n.to_string()),
            }),
            _ => None,
        }
    }
}

impl<R: BufRead> Iterator for WigReader<R> {
    type Item = Result<WigDataPoint, WigParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_buffer.clear();
            match self.reader.read_line(&mut self.line_buffer) {
                Ok(0) => return None, // EOF
                Ok(_) => self.line_number += 1,
                Err(e) => return Some(Err(WigParseError::IoError(e.to_string()))),
            }

            let line = self.line_buffer.trim();

            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            if line.starts_with("variableStep") || line.starts_with("fixedStep") {
                match WigDeclaration::parse_at(line, self.line_number) {
                    Ok(decl) => {
                        if decl.format == WigFormat::FixedStep {
                            // 1-based to 0-based
                            self.current_pos = decl.start.unwrap_or(1).saturating_sub(1);
                        }
                        self.current_decl = Some(decl);
                        continue;
                    }
                    Err(e) => return Some(Err(e)),
                }
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if let Some(point) = Self::parse_bedgraph(&parts) {
                return Some(Ok(point));
            }

            let decl = match &self.current_decl {
                Some(d) => d,
                None => {
                    return Some(Err(WigParseError::InvalidFormat {
                        line: self.line_number,
                        message: "Data line before declaration".to_string(),
                    }));
                }
            };

            return Some(match decl.format {
                WigFormat::VariableStep => {
                    if parts.len() < 2 {
                        return Some(Err(WigParseError::InvalidFormat {
                            line: self.line_number,
                            message: format!("Expected position and value: {}", line),
                        }));
                    }
                    // Wiggle positions are 1-based
                    match (parts[0].parse::<u64>(), parts[1].parse::<f32>()) {
                        (Ok(pos), Ok(value)) if pos >= 1 => Ok(WigDataPoint {
                            chrom: decl.chrom.clone(),
                            start: pos - 1,
                            end: pos - 1 + decl.span,
                            value,
                            name: None,
                        }),
                        (Ok(_), Ok(_)) | (Err(_), _) => Err(self.invalid_number(parts[0])),
                        (Ok(_), Err(_)) => Err(self.invalid_number(parts[1])),
                    }
                }
                WigFormat::FixedStep => match line.parse::<f32>() {
                    Ok(value) => {
                        let start = self.current_pos;
                        let end = start + decl.span;
                        self.current_pos += decl.step.unwrap_or(decl.span);
                        Ok(WigDataPoint {
                            chrom: decl.chrom.clone(),
                            start,
                            end,
                            value,
                            name: None,
                        })
                    }
                    Err(_) => Err(self.invalid_number(line)),
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NamedScore;
    use std::io::Cursor;

    fn read(content: &str) -> Vec<Result<WigDataPoint, WigParseError>> {
        WigReader::new(Cursor::new(content.as_bytes().to_vec())).collect()
    }

    #[test]
    fn test_variable_step_declaration() {
        let decl = WigDeclaration::parse("variableStep chrom=chr1 span=10").unwrap();

        assert_eq!(decl.format, WigFormat::VariableStep);
        assert_eq!(decl.chrom, "chr1");
        assert_eq!(decl.span, 10);
        assert!(decl.start.is_none());
        assert!(decl.step.is_none());
    }

    #[test]
    fn test_fixed_step_declaration() {
        let decl = WigDeclaration::parse("fixedStep chrom=chr2 start=1000 step=100 span=50").unwrap();

        assert_eq!(decl.format, WigFormat::FixedStep);
        assert_eq!(decl.span, 50);
        assert_eq!(decl.start, Some(1000));
        assert_eq!(decl.step, Some(100));
    }

    #[test]
    fn test_declaration_errors() {
        assert_eq!(
            WigDeclaration::parse("variableStep span=10").unwrap_err(),
            WigParseError::MissingChrom
        );
        assert_eq!(
            WigDeclaration::parse("fixedStep chrom=chr1 step=100").unwrap_err(),
            WigParseError::MissingStart
        );
        assert!(matches!(
            WigDeclaration::parse("variableStep chrom=chr1 span=x"),
            Err(WigParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_wig_reader_variable_step() {
        let points = read("variableStep chrom=chr1 span=10\n1000 1.5\n2000 2.5\n");
        assert_eq!(points.len(), 2);

        let p0 = points[0].as_ref().unwrap();
        assert_eq!(p0.chrom, "chr1");
        assert_eq!((p0.start, p0.end), (999, 1009));
        assert_eq!(p0.value, 1.5);
        assert_eq!(p0.name, None);
    }

    #[test]
    fn test_wig_reader_fixed_step() {
        let points = read("fixedStep chrom=chr1 start=1000 step=100 span=50\n1.0\n2.0\n3.0\n");
        let spans: Vec<_> = points
            .iter()
            .map(|p| {
                let p = p.as_ref().unwrap();
                (p.start, p.end)
            })
            .collect();
        assert_eq!(spans, vec![(999, 1049), (1099, 1149), (1199, 1249)]);
    }

    #[test]
    fn test_wig_reader_skips_headers() {
        let points = read(
            "# comment\ntrack type=wiggle_0 name=\"test\"\nbrowser position chr1:1-2\nvariableStep chrom=chr1\n5 1\n",
        );
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_bedgraph_with_names() {
        let points = read("chr1\t0\t10\t2.5\tprobeA\nchr1\t10\t20\t-1\n");
        let p0 = points[0].as_ref().unwrap();
        assert_eq!(p0.name.as_deref(), Some("probeA"));
        let p1 = points[1].as_ref().unwrap();
        assert_eq!((p1.start, p1.end, p1.value), (10, 20, -1.0));
        assert_eq!(p1.name, None);
    }

    #[test]
    fn test_data_before_declaration_is_error() {
        let points = read("1000 1.5\n");
        assert!(matches!(
            points[0],
            Err(WigParseError::InvalidFormat { line: 1, .. })
        ));
    }

    #[test]
    fn test_zero_position_rejected() {
        let points = read("variableStep chrom=chr1\n0 1.5\n");
        assert!(matches!(
            points[0],
            Err(WigParseError::InvalidNumber { line: 2, .. })
        ));
    }

    #[test]
    fn test_bedgraph_record_to_line() {
        let score: LocusScore = NamedScore::new(Position::new(100), Position::new(200), 1.5).into();
        assert_eq!(
            BedGraphRecord::from_score("chr1", &score).to_line(),
            "chr1\t100\t200\t1.5"
        );

        let named: LocusScore = NamedScore::new(Position::new(0), Position::new(5), 2.0)
            .with_name(Some("g".to_string()))
            .into();
        assert_eq!(
            BedGraphRecord::from_score("chr2", &named).to_line(),
            "chr2\t0\t5\t2\tg"
        );
    }

    #[test]
    fn test_write_bedgraph_skips_nan() {
        let scores: Vec<LocusScore> = vec![
            NamedScore::new(Position::new(0), Position::new(1), 1.0).into(),
            NamedScore::new(Position::new(1), Position::new(2), f32::NAN).into(),
        ];
        let mut out = Vec::new();
        let written = write_bedgraph(&mut out, "chr1", &scores).unwrap();
        assert_eq!(written, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t0\t1\t1\n");
    }
}
