//! Bounded-memory aggregation for one output bin
//!
//! Min, max and the length-weighted mean are tracked exactly in streaming form.
//! Order statistics (median, 10th and 90th percentile) and the constituent list
//! shown in composite scores come from a reservoir holding the first
//! `capacity` samples of the bin; later samples still update the streaming
//! statistics and [`Accumulator::count`] but are not retained.

use crate::core::WindowFunction;

/// Samples retained per bin unless configured otherwise
pub const DEFAULT_SAMPLE_CAPACITY: usize = 5;

/// One retained sample
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Feature length, used as weight for the mean
    pub length: u64,
    pub value: f32,
    pub name: Option<String>,
}

/// Streaming statistics for one bin
#[derive(Debug, Clone)]
pub struct Accumulator {
    window_function: WindowFunction,
    capacity: usize,
    samples: Vec<Sample>,
    count: usize,
    weight_sum: f64,
    weighted_sum: f64,
    min: f32,
    max: f32,
}

impl Accumulator {
    pub fn new(window_function: WindowFunction) -> Self {
        Self::with_capacity(window_function, DEFAULT_SAMPLE_CAPACITY)
    }

    /// Accumulator retaining at most `capacity` samples (at least one)
    pub fn with_capacity(window_function: WindowFunction, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window_function,
            capacity,
            samples: Vec::with_capacity(capacity),
            count: 0,
            weight_sum: 0.0,
            weighted_sum: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    /// Add a sample; NaN values carry no data and are ignored
    pub fn add(&mut self, length: u64, value: f32, name: Option<&str>) {
        if value.is_nan() {
            return;
        }
        let weight = length.max(1);

        self.count += 1;
        self.weight_sum += weight as f64;
        self.weighted_sum += weight as f64 * value as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        if self.samples.len() < self.capacity {
            self.samples.push(Sample {
                length: weight,
                value,
                name: name.map(str::to_string),
            });
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }

    /// Number of samples added, including ones beyond the reservoir
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window_function(&self) -> WindowFunction {
        self.window_function
    }

    /// Retained samples in insertion order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Aggregate under the configured window function
    ///
    /// Returns NaN when no sample was added. The pass-through function has no
    /// aggregate of its own and reports the mean.
    pub fn value(&self) -> f32 {
        if !self.has_data() {
            return f32::NAN;
        }
        match self.window_function {
            WindowFunction::None | WindowFunction::Mean => {
                (self.weighted_sum / self.weight_sum) as f32
            }
            WindowFunction::Min => self.min,
            WindowFunction::Max => self.max,
            WindowFunction::Median | WindowFunction::Percentile10 | WindowFunction::Percentile90 => {
                let p = self.window_function.percentile().unwrap_or(50.0);
                let mut values: Vec<f32> = self.samples.iter().map(|s| s.value).collect();
                percentile(&mut values, p)
            }
        }
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// Uses the `p * (n + 1) / 100` position estimate; positions outside the data
/// clamp to the smallest or largest value.
fn percentile(values: &mut [f32], p: f64) -> f32 {
    let n = values.len();
    match n {
        0 => return f32::NAN,
        1 => return values[0],
        _ => {}
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let pos = p * (n as f64 + 1.0) / 100.0;
    let fpos = pos.floor();
    if pos < 1.0 {
        return values[0];
    }
    if pos >= n as f64 {
        return values[n - 1];
    }
    let lower = values[fpos as usize - 1] as f64;
    let upper = values[fpos as usize] as f64;
    (lower + (pos - fpos) * (upper - lower)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accumulator_is_nan() {
        for wf in WindowFunction::ALL {
            let acc = Accumulator::new(wf);
            assert!(!acc.has_data());
            assert_eq!(acc.count(), 0);
            assert!(acc.value().is_nan());
            assert!(acc.samples().is_empty());
        }
    }

    #[test]
    fn test_mean_two_samples() {
        let mut acc = Accumulator::new(WindowFunction::Mean);
        acc.add(1, 1.0, None);
        acc.add(1, 3.0, None);
        assert!(acc.has_data());
        assert_eq!(acc.count(), 2);
        assert!((acc.value() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_is_length_weighted() {
        let mut acc = Accumulator::new(WindowFunction::Mean);
        acc.add(3, 1.0, None);
        acc.add(1, 5.0, None);
        assert!((acc.value() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_min_max() {
        let mut min = Accumulator::new(WindowFunction::Min);
        let mut max = Accumulator::new(WindowFunction::Max);
        for v in [4.0, -2.0, 7.5, 1.0] {
            min.add(1, v, None);
            max.add(1, v, None);
        }
        assert_eq!(min.value(), -2.0);
        assert_eq!(max.value(), 7.5);
    }

    #[test]
    fn test_median() {
        let mut odd = Accumulator::new(WindowFunction::Median);
        for v in [5.0, 1.0, 3.0] {
            odd.add(1, v, None);
        }
        assert_eq!(odd.value(), 3.0);

        let mut even = Accumulator::new(WindowFunction::Median);
        even.add(1, 1.0, None);
        even.add(1, 3.0, None);
        assert!((even.value() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_percentiles_clamp_to_extremes() {
        let mut p10 = Accumulator::new(WindowFunction::Percentile10);
        let mut p90 = Accumulator::new(WindowFunction::Percentile90);
        for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
            p10.add(1, v, None);
            p90.add(1, v, None);
        }
        // position 0.6 and 5.4 fall outside 1..=5
        assert_eq!(p10.value(), 10.0);
        assert_eq!(p90.value(), 50.0);
    }

    #[test]
    fn test_reservoir_is_bounded() {
        let mut acc = Accumulator::with_capacity(WindowFunction::Max, 2);
        acc.add(1, 1.0, Some("a"));
        acc.add(1, 2.0, Some("b"));
        acc.add(1, 9.0, Some("c"));

        assert_eq!(acc.count(), 3);
        assert_eq!(acc.samples().len(), 2);
        assert_eq!(acc.samples()[1].name.as_deref(), Some("b"));
        // streaming statistics still see the dropped sample
        assert_eq!(acc.value(), 9.0);
    }

    #[test]
    fn test_default_capacity() {
        let mut acc = Accumulator::new(WindowFunction::Median);
        for i in 0..20 {
            acc.add(1, i as f32, None);
        }
        assert_eq!(acc.capacity(), DEFAULT_SAMPLE_CAPACITY);
        assert_eq!(acc.samples().len(), DEFAULT_SAMPLE_CAPACITY);
        assert_eq!(acc.count(), 20);
        // median over the retained 0..5
        assert_eq!(acc.value(), 2.0);
    }

    #[test]
    fn test_nan_ignored() {
        let mut acc = Accumulator::new(WindowFunction::Mean);
        acc.add(1, f32::NAN, None);
        assert!(!acc.has_data());
        acc.add(1, 4.0, None);
        assert_eq!(acc.value(), 4.0);
    }

    #[test]
    fn test_zero_length_counts_as_one() {
        let mut acc = Accumulator::new(WindowFunction::Mean);
        acc.add(0, 2.0, None);
        acc.add(0, 4.0, None);
        assert!((acc.value() - 3.0).abs() < 1e-6);
        assert_eq!(acc.samples()[0].length, 1);
    }
}
