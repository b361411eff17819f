//! Genome and coordinate model
//!
//! A [`Genome`] is an ordered list of chromosomes plus the rules for turning
//! coordinate text into internal [`Position`]s. Standard genomes use plain
//! integer coordinates. Genetic map genomes store coordinates pre-scaled by an
//! integer factor (e.g. centimorgans × 1000) and reconstruct sub-unit precision
//! into the position's fraction.

use crate::core::error::{CoordinateError, CoordinateResult, GenomeError, GenomeResult};
use crate::core::io::{open_input, LineIterator};
use crate::core::Position;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Name of the pseudo-chromosome spanning the whole genome
pub const ALL_CHROMOSOMES: &str = "All";

/// Default number of decimals used when printing genetic map coordinates
pub const DEFAULT_DECIMAL_PLACES: usize = 2;

/// A named chromosome and its length in genome units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    pub name: String,
    pub length: u64,
}

impl Chromosome {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// Scaling and display rules of a genetic map genome
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticMap {
    /// Integer factor coordinate text is pre-multiplied by
    pub factor: i64,
    /// Decimals shown when formatting positions and lengths
    pub decimal_places: usize,
    /// Unit suffix, e.g. "cM"
    pub unit: String,
    /// Label for exactly one unit, e.g. "centimorgan"
    pub unit_singular: String,
}

impl GeneticMap {
    pub fn new(factor: i64, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        Self {
            factor: factor.max(1),
            decimal_places: DEFAULT_DECIMAL_PLACES,
            unit_singular: unit.clone(),
            unit,
        }
    }

    pub fn with_decimal_places(mut self, decimal_places: usize) -> Self {
        self.decimal_places = decimal_places;
        self
    }

    pub fn with_unit_singular(mut self, unit_singular: impl Into<String>) -> Self {
        self.unit_singular = unit_singular.into();
        self
    }

    /// Read genetic map settings from genome properties
    ///
    /// Recognized keys: `factor` (required), `decimalPlaces`, `unit`,
    /// `unitSingular`. Returns `Ok(None)` when no `factor` is present, meaning
    /// the genome is a standard one.
    pub fn from_properties(props: &HashMap<String, String>) -> GenomeResult<Option<Self>> {
        let factor = match props.get("factor") {
            Some(v) => v.trim().parse::<i64>().ok().filter(|f| *f > 0).ok_or_else(|| {
                GenomeError::InvalidProperty {
                    key: "factor".to_string(),
                    value: v.clone(),
                }
            })?,
            None => return Ok(None),
        };

        let unit = props
            .get("unit")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "cM".to_string());
        let mut map = GeneticMap::new(factor, unit);

        if let Some(v) = props.get("decimalPlaces") {
            map.decimal_places = v.trim().parse().map_err(|_| GenomeError::InvalidProperty {
                key: "decimalPlaces".to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = props.get("unitSingular") {
            map.unit_singular = v.trim().to_string();
        }

        Ok(Some(map))
    }
}

/// Context in which a unit label is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayContext {
    /// Ruler / scale labels, thousands of bases for standard genomes
    Kilo,
    /// Single position labels
    Single,
}

/// Ordered chromosome collection with coordinate rules
#[derive(Debug, Clone)]
pub struct Genome {
    id: String,
    chromosomes: Vec<Chromosome>,
    lookup: HashMap<String, usize>,
    /// Normalized chromosome name -> index
    aliases: HashMap<String, usize>,
    genetic_map: Option<GeneticMap>,
}

impl Genome {
    /// Build a standard genome from chromosomes in display order
    pub fn new(id: impl Into<String>, chromosomes: Vec<Chromosome>) -> GenomeResult<Self> {
        let mut lookup = HashMap::with_capacity(chromosomes.len());
        let mut aliases = HashMap::with_capacity(chromosomes.len());

        for (idx, chrom) in chromosomes.iter().enumerate() {
            if lookup.insert(chrom.name.clone(), idx).is_some() {
                return Err(GenomeError::DuplicateChromosome(chrom.name.clone()));
            }
            aliases.entry(normalize_chrom(&chrom.name)).or_insert(idx);
        }

        Ok(Self {
            id: id.into(),
            chromosomes,
            lookup,
            aliases,
            genetic_map: None,
        })
    }

    pub fn with_genetic_map(mut self, genetic_map: GeneticMap) -> Self {
        self.genetic_map = Some(genetic_map);
        self
    }

    /// Parse a chromosome sizes table (`name<TAB>length`)
    ///
    /// Blank lines and `#` comments are skipped. For genetic map genomes the
    /// length column is pre-scaled text and goes through [`Genome::parse_coordinate`];
    /// the stored length is rounded up to whole units.
    pub fn from_chrom_sizes_reader<R: BufRead>(
        id: impl Into<String>,
        reader: R,
        genetic_map: Option<GeneticMap>,
    ) -> GenomeResult<Self> {
        let scaler = Genome {
            id: String::new(),
            chromosomes: Vec::new(),
            lookup: HashMap::new(),
            aliases: HashMap::new(),
            genetic_map: genetic_map.clone(),
        };

        let mut chromosomes = Vec::new();
        let mut lines = LineIterator::new(reader);
        while let Some(line) = lines.next_line() {
            let line = line?.trim().to_string();
            let line_number = lines.line_number();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (name, length) = match (fields.next(), fields.next()) {
                (Some(name), Some(length)) => (name, length),
                _ => {
                    return Err(GenomeError::InvalidLine {
                        line: line_number,
                        message: format!("expected name and length, got '{}'", line),
                    })
                }
            };

            let length = scaler
                .parse_coordinate(length)
                .map_err(|source| GenomeError::InvalidLength {
                    line: line_number,
                    source,
                })?;
            if length.base < 0 {
                return Err(GenomeError::InvalidLine {
                    line: line_number,
                    message: format!("negative length for {}", name),
                });
            }
            chromosomes.push(Chromosome::new(name, length.ceil() as u64));
        }

        let genome = Genome::new(id, chromosomes)?;
        Ok(match genetic_map {
            Some(map) => genome.with_genetic_map(map),
            None => genome,
        })
    }

    /// Load a chromosome sizes file, optionally compressed
    pub fn from_chrom_sizes_file(
        path: &Path,
        genetic_map: Option<GeneticMap>,
    ) -> GenomeResult<Self> {
        if !path.exists() {
            return Err(GenomeError::FileNotFound(path.to_path_buf()));
        }
        let id = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.split('.').next().unwrap_or(n).to_string())
            .unwrap_or_default();
        Self::from_chrom_sizes_reader(id, open_input(path)?, genetic_map)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn chromosome_names(&self) -> impl Iterator<Item = &str> {
        self.chromosomes.iter().map(|c| c.name.as_str())
    }

    pub fn chromosome_count(&self) -> usize {
        self.chromosomes.len()
    }

    /// Look up a chromosome, accepting `chr1` / `1` / `CHR1` style variants
    pub fn chromosome(&self, name: &str) -> Option<&Chromosome> {
        self.lookup
            .get(name)
            .or_else(|| self.aliases.get(&normalize_chrom(name)))
            .map(|&idx| &self.chromosomes[idx])
    }

    /// Canonical chromosome name as stored in the genome
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        if name == ALL_CHROMOSOMES {
            return ALL_CHROMOSOMES;
        }
        self.chromosome(name).map(|c| c.name.as_str()).unwrap_or(name)
    }

    /// Length of a chromosome; the `All` pseudo-chromosome spans every
    /// chromosome. Unknown names have length 0.
    pub fn chromosome_length(&self, name: &str) -> u64 {
        if name == ALL_CHROMOSOMES {
            return self.total_length();
        }
        self.chromosome(name).map(|c| c.length).unwrap_or(0)
    }

    pub fn total_length(&self) -> u64 {
        self.chromosomes.iter().map(|c| c.length).sum()
    }

    pub fn is_genetic_map(&self) -> bool {
        self.genetic_map.is_some()
    }

    pub fn genetic_map(&self) -> Option<&GeneticMap> {
        self.genetic_map.as_ref()
    }

    /// Smallest width a feature can have in this genome's units
    pub fn min_feature_width(&self) -> f64 {
        if self.is_genetic_map() {
            crate::core::position::GENETIC_MAP_EPSILON
        } else {
            1.0
        }
    }

    /// Convert coordinate text to an internal position
    ///
    /// # Examples
    /// ```
    /// use fast_tiletrack::core::{Chromosome, Genome, GeneticMap};
    ///
    /// let genome = Genome::new("hg", vec![Chromosome::new("chr1", 1000)]).unwrap();
    /// let p = genome.parse_coordinate("150").unwrap();
    /// assert_eq!((p.base, p.fraction), (150, 0.0));
    ///
    /// let map = genome.with_genetic_map(GeneticMap::new(1000, "cM"));
    /// let p = map.parse_coordinate("12000").unwrap();
    /// assert_eq!((p.base, p.fraction), (12, 0.0));
    /// ```
    pub fn parse_coordinate(&self, text: &str) -> CoordinateResult<Position> {
        let text = text.trim();
        match &self.genetic_map {
            None => text
                .parse::<i64>()
                .map(Position::new)
                .map_err(|e| CoordinateError::InvalidInteger {
                    value: text.to_string(),
                    message: e.to_string(),
                }),
            Some(_) => {
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| CoordinateError::InvalidNumber {
                        value: text.to_string(),
                        message: "not a finite number".to_string(),
                    })?;
                Ok(self.scale_coordinate(value))
            }
        }
    }

    /// Convert an already numeric coordinate to an internal position
    pub fn scale_coordinate(&self, value: f64) -> Position {
        match &self.genetic_map {
            None => Position::from_f64(value),
            Some(map) => {
                let scaled = value / map.factor as f64;
                let base = scaled.round();
                Position::with_fraction(base as i64, scaled - base)
            }
        }
    }

    /// Unit label for ruler and position displays
    pub fn unit_label(&self, context: DisplayContext) -> &str {
        match (&self.genetic_map, context) {
            (Some(map), DisplayContext::Kilo) => &map.unit,
            (Some(map), DisplayContext::Single) => &map.unit_singular,
            (None, DisplayContext::Kilo) => "kb",
            (None, DisplayContext::Single) => "bp",
        }
    }

    /// Human readable length
    ///
    /// Standard genomes escalate through bp, kb, Mb and Gb. Genetic maps always
    /// print their native unit with the configured number of decimals.
    pub fn format_length(&self, length: f64) -> String {
        if let Some(map) = &self.genetic_map {
            let unit = if (length - 1.0).abs() < f64::EPSILON {
                &map.unit_singular
            } else {
                &map.unit
            };
            return format!("{:.*} {}", map.decimal_places, length, unit);
        }

        let abs = length.abs();
        if abs >= 1e9 {
            format!("{:.2} Gb", length / 1e9)
        } else if abs >= 1e6 {
            format!("{:.2} Mb", length / 1e6)
        } else if abs >= 1e3 {
            format!("{:.2} kb", length / 1e3)
        } else {
            format!("{} bp", length.round() as i64)
        }
    }

    /// Position text in this genome's display precision
    pub fn format_position(&self, position: Position) -> String {
        match &self.genetic_map {
            Some(map) => format!("{:.*}", map.decimal_places, position.as_f64()),
            None => position.base.to_string(),
        }
    }
}

/// Read `key=value` genome properties, skipping blanks and `#` comments
pub fn read_properties<R: BufRead>(reader: R) -> GenomeResult<HashMap<String, String>> {
    let mut props = HashMap::new();
    let mut lines = LineIterator::new(reader);
    while let Some(line) = lines.next_line() {
        let line = line?.trim().to_string();
        let line_number = lines.line_number();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                props.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                return Err(GenomeError::InvalidLine {
                    line: line_number,
                    message: format!("expected key=value, got '{}'", line),
                })
            }
        }
    }
    Ok(props)
}

/// Normalize chromosome name for lookup (handles chr1/1/CHR1 variants)
///
/// # Examples
/// ```
/// use fast_tiletrack::core::normalize_chrom;
///
/// assert_eq!(normalize_chrom("chr1"), normalize_chrom("1"));
/// assert_eq!(normalize_chrom("chrM"), normalize_chrom("MT"));
/// ```
pub fn normalize_chrom(chrom: &str) -> String {
    let without_prefix = match (chrom.get(..3), chrom.get(3..)) {
        (Some(prefix), Some(rest)) if !rest.is_empty() && prefix.eq_ignore_ascii_case("chr") => {
            rest
        }
        _ => chrom,
    };

    let upper = without_prefix.to_uppercase();
    if upper == "M" {
        "MT".to_string()
    } else {
        upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn test_genome() -> Genome {
        Genome::new(
            "test",
            vec![
                Chromosome::new("chr1", 1000),
                Chromosome::new("chr2", 500),
                Chromosome::new("chrM", 16),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_chromosome_length() {
        let genome = test_genome();
        assert_eq!(genome.chromosome_length("chr1"), 1000);
        assert_eq!(genome.chromosome_length("chr2"), 500);
        assert_eq!(genome.chromosome_length("chrUn"), 0);
        assert_eq!(genome.chromosome_length(ALL_CHROMOSOMES), 1516);
    }

    #[test]
    fn test_chromosome_aliases() {
        let genome = test_genome();
        assert_eq!(genome.chromosome("1").map(|c| c.length), Some(1000));
        assert_eq!(genome.chromosome("CHR2").map(|c| c.length), Some(500));
        assert_eq!(genome.chromosome("MT").map(|c| c.name.as_str()), Some("chrM"));
        assert_eq!(genome.canonical_name("2"), "chr2");
        assert_eq!(genome.canonical_name("All"), "All");
    }

    #[test]
    fn test_duplicate_chromosome() {
        let result = Genome::new(
            "dup",
            vec![Chromosome::new("chr1", 10), Chromosome::new("chr1", 20)],
        );
        assert!(matches!(result, Err(GenomeError::DuplicateChromosome(_))));
    }

    #[test]
    fn test_parse_coordinate_standard() {
        let genome = test_genome();
        let p = genome.parse_coordinate("12345").unwrap();
        assert_eq!(p.base, 12345);
        assert_eq!(p.fraction, 0.0);
        assert!(genome.parse_coordinate("12.5").is_err());
        assert!(matches!(
            genome.parse_coordinate("abc"),
            Err(CoordinateError::InvalidInteger { .. })
        ));
    }

    #[test]
    fn test_parse_coordinate_genetic_map() {
        let genome = test_genome().with_genetic_map(GeneticMap::new(1000, "cM"));

        let exact = genome.parse_coordinate("42000").unwrap();
        assert_eq!(exact.base, 42);
        assert_eq!(exact.fraction, 0.0);

        let p = genome.parse_coordinate("42250").unwrap();
        assert_eq!(p.base, 42);
        assert!((p.fraction - 0.25).abs() < 1e-12);

        // round() lands on 43, the remainder is folded back into [0, 1)
        let q = genome.parse_coordinate("42750").unwrap();
        assert_eq!(q.base, 42);
        assert!((q.fraction - 0.75).abs() < 1e-12);

        assert!(matches!(
            genome.parse_coordinate("x"),
            Err(CoordinateError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_scale_coordinate_numeric() {
        let genome = test_genome().with_genetic_map(GeneticMap::new(100, "cM"));
        let p = genome.scale_coordinate(250.0);
        assert!((p.as_f64() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_unit_labels() {
        let genome = test_genome();
        assert_eq!(genome.unit_label(DisplayContext::Kilo), "kb");
        assert_eq!(genome.unit_label(DisplayContext::Single), "bp");

        let map = genome.with_genetic_map(
            GeneticMap::new(1000, "cM").with_unit_singular("centimorgan"),
        );
        assert_eq!(map.unit_label(DisplayContext::Kilo), "cM");
        assert_eq!(map.unit_label(DisplayContext::Single), "centimorgan");
    }

    #[test]
    fn test_format_length() {
        let genome = test_genome();
        assert_eq!(genome.format_length(512.0), "512 bp");
        assert_eq!(genome.format_length(1500.0), "1.50 kb");
        assert_eq!(genome.format_length(2_500_000.0), "2.50 Mb");
        assert_eq!(genome.format_length(3_100_000_000.0), "3.10 Gb");

        let map = genome.with_genetic_map(
            GeneticMap::new(1000, "cM")
                .with_decimal_places(1)
                .with_unit_singular("centimorgan"),
        );
        // no unit escalation for genetic maps
        assert_eq!(map.format_length(2_500_000.0), "2500000.0 cM");
        assert_eq!(map.format_length(1.0), "1.0 centimorgan");
    }

    #[test]
    fn test_from_chrom_sizes_reader() {
        let data = "# sizes\nchr1\t1000\n\nchr2\t2000\n";
        let genome = Genome::from_chrom_sizes_reader("g", Cursor::new(data), None).unwrap();
        assert_eq!(genome.chromosome_count(), 2);
        let names: Vec<&str> = genome.chromosome_names().collect();
        assert_eq!(names, vec!["chr1", "chr2"]);
        assert_eq!(genome.chromosome_length("chr2"), 2000);
    }

    #[test]
    fn test_from_chrom_sizes_genetic_map() {
        let data = "1\t286500\n2\t270000\n";
        let genome = Genome::from_chrom_sizes_reader(
            "map",
            Cursor::new(data),
            Some(GeneticMap::new(1000, "cM")),
        )
        .unwrap();
        assert!(genome.is_genetic_map());
        assert_eq!(genome.chromosome_length("1"), 287);
        assert_eq!(genome.chromosome_length("2"), 270);
    }

    #[test]
    fn test_from_chrom_sizes_errors() {
        let missing = Genome::from_chrom_sizes_reader("g", Cursor::new("chr1\n"), None);
        assert!(matches!(missing, Err(GenomeError::InvalidLine { line: 1, .. })));

        let bad = Genome::from_chrom_sizes_reader("g", Cursor::new("chr1\t10\nchr2\tten\n"), None);
        assert!(matches!(bad, Err(GenomeError::InvalidLength { line: 2, .. })));
    }

    #[test]
    fn test_genetic_map_from_properties() {
        let props = read_properties(Cursor::new(
            "# genetic map\nfactor=1000\ndecimalPlaces=3\nunit=cM\nunitSingular=centimorgan\n",
        ))
        .unwrap();
        let map = GeneticMap::from_properties(&props).unwrap().unwrap();
        assert_eq!(map.factor, 1000);
        assert_eq!(map.decimal_places, 3);
        assert_eq!(map.unit, "cM");
        assert_eq!(map.unit_singular, "centimorgan");

        assert!(GeneticMap::from_properties(&HashMap::new()).unwrap().is_none());

        let mut bad = HashMap::new();
        bad.insert("factor".to_string(), "-3".to_string());
        assert!(GeneticMap::from_properties(&bad).is_err());
    }

    #[test]
    fn test_format_position() {
        let genome = test_genome();
        assert_eq!(genome.format_position(Position::new(1234)), "1234");
        let map = genome.with_genetic_map(GeneticMap::new(1000, "cM"));
        assert_eq!(map.format_position(Position::from_f64(12.5)), "12.50");
    }

    #[test]
    fn test_normalize_chrom() {
        assert_eq!(normalize_chrom("chr1"), "1");
        assert_eq!(normalize_chrom("CHR1"), "1");
        assert_eq!(normalize_chrom("x"), "X");
        assert_eq!(normalize_chrom("chrM"), "MT");
        assert_eq!(normalize_chrom("M"), "MT");
    }

    #[test]
    fn test_normalize_chrom_non_ascii() {
        assert_eq!(normalize_chrom("αβ"), "ΑΒ");
        assert_eq!(normalize_chrom("chrα"), "Α");
        assert_eq!(normalize_chrom("ch"), "CH");
        assert!(test_genome().chromosome("αβ").is_none());
        assert_eq!(test_genome().chromosome_length("αβ"), 0);
    }
}
