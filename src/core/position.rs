//! Genome positions
//!
//! A [`Position`] is an integer base plus a fractional offset. Standard genomes
//! always carry a zero fraction; genetic map genomes store sub-unit precision in
//! the fraction.

use std::cmp::Ordering;
use std::fmt;

/// Minimum feature width for genetic map coordinates.
///
/// Standard genomes use a width of one base instead.
pub const GENETIC_MAP_EPSILON: f64 = 1e-6;

/// Integer base coordinate plus a fractional offset in `[0, 1)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub base: i64,
    pub fraction: f64,
}

impl Position {
    pub const ZERO: Position = Position { base: 0, fraction: 0.0 };

    /// Position on an integer base
    pub const fn new(base: i64) -> Self {
        Self { base, fraction: 0.0 }
    }

    /// Build a position from a base and a remainder
    ///
    /// The remainder may be any finite value (e.g. the negative remainder left
    /// by rounding); the result is normalized so `fraction` lies in `[0, 1)`.
    ///
    /// # Examples
    /// ```
    /// use fast_tiletrack::core::Position;
    /// let p = Position::with_fraction(5, -0.25);
    /// assert_eq!(p.base, 4);
    /// assert!((p.fraction - 0.75).abs() < 1e-12);
    /// ```
    pub fn with_fraction(base: i64, fraction: f64) -> Self {
        if (0.0..1.0).contains(&fraction) {
            return Self { base, fraction };
        }
        let carry = fraction.floor();
        Self::normalized(base + carry as i64, fraction - carry)
    }

    /// Split a floating point coordinate into base and fraction
    pub fn from_f64(value: f64) -> Self {
        let base = value.floor();
        Self::normalized(base as i64, value - base)
    }

    // Subtracting a floor can round up to exactly 1.0 for tiny negative inputs
    fn normalized(base: i64, fraction: f64) -> Self {
        if fraction >= 1.0 {
            Self { base: base + 1, fraction: 0.0 }
        } else {
            Self { base, fraction }
        }
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.base as f64 + self.fraction
    }

    pub fn is_integral(&self) -> bool {
        self.fraction == 0.0
    }

    /// Smallest integer coordinate at or after this position
    pub fn ceil(&self) -> i64 {
        if self.is_integral() {
            self.base
        } else {
            self.base + 1
        }
    }

    pub fn max(self, other: Position) -> Position {
        if other > self {
            other
        } else {
            self
        }
    }

    pub fn min(self, other: Position) -> Position {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_f64().partial_cmp(&other.as_f64())
    }
}

impl From<i64> for Position {
    fn from(base: i64) -> Self {
        Position::new(base)
    }
}

impl From<u64> for Position {
    fn from(base: u64) -> Self {
        Position::new(base as i64)
    }
}

impl From<i32> for Position {
    fn from(base: i32) -> Self {
        Position::new(base as i64)
    }
}

impl From<f64> for Position {
    fn from(value: f64) -> Self {
        Position::from_f64(value)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{}", self.as_f64())
        }
    }
}
