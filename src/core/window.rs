//! Window functions applied to the samples of one bin

use std::fmt;

/// Aggregation rule for the samples that fall into one bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowFunction {
    /// Raw pass-through, no aggregation
    None,
    #[default]
    Mean,
    Min,
    Max,
    Median,
    /// 10th percentile
    Percentile10,
    /// 90th percentile
    Percentile90,
}

impl WindowFunction {
    /// Every window function, pass-through first
    pub const ALL: [WindowFunction; 7] = [
        WindowFunction::None,
        WindowFunction::Mean,
        WindowFunction::Min,
        WindowFunction::Max,
        WindowFunction::Median,
        WindowFunction::Percentile10,
        WindowFunction::Percentile90,
    ];

    /// Parse from string (for CLI argument and cache keys)
    ///
    /// # Examples
    /// ```
    /// use fast_tiletrack::core::WindowFunction;
    /// assert_eq!(WindowFunction::from_str("mean"), Some(WindowFunction::Mean));
    /// assert_eq!(WindowFunction::from_str("p90"), Some(WindowFunction::Percentile90));
    /// assert_eq!(WindowFunction::from_str("sum"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "raw" => Some(WindowFunction::None),
            "mean" | "avg" => Some(WindowFunction::Mean),
            "min" => Some(WindowFunction::Min),
            "max" => Some(WindowFunction::Max),
            "median" => Some(WindowFunction::Median),
            "percentile10" | "p10" => Some(WindowFunction::Percentile10),
            "percentile90" | "p90" => Some(WindowFunction::Percentile90),
            _ => None,
        }
    }

    /// Stable name used in cache keys and display strings
    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::None => "none",
            WindowFunction::Mean => "mean",
            WindowFunction::Min => "min",
            WindowFunction::Max => "max",
            WindowFunction::Median => "median",
            WindowFunction::Percentile10 => "percentile10",
            WindowFunction::Percentile90 => "percentile90",
        }
    }

    /// Whether scores are merged into bins
    pub fn is_aggregating(&self) -> bool {
        !matches!(self, WindowFunction::None)
    }

    /// Percentile (0-100) for order statistics, None for the others
    pub fn percentile(&self) -> Option<f64> {
        match self {
            WindowFunction::Median => Some(50.0),
            WindowFunction::Percentile10 => Some(10.0),
            WindowFunction::Percentile90 => Some(90.0),
            _ => None,
        }
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
