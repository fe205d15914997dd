//! Summary statistics of extracted cells.
//!
//! Cells that are NaN are never counted. Cells matching a [Missing] descriptor are also
//! excluded when one is provided.

use crate::types::Missing;

use ndarray::{Array1, ArrayBase, ArrayView1, Data, Dimension};
use ndarray_stats::interpolate::Midpoint;
use ndarray_stats::Quantile1dExt;
use noisy_float::types::{n64, N64};

/// Returns a filter function that can be used with the Iterator trait's filter() method to filter
/// out missing data.
///
/// # Arguments
///
/// * `missing`: Missing data description, if any.
fn missing_filter(missing: Option<&Missing<f64>>) -> Box<dyn Fn(&f64) -> bool + '_> {
    match missing {
        None => Box::new(|x: &f64| !x.is_nan()),
        Some(missing) => Box::new(move |x: &f64| !x.is_nan() && !missing.is_missing(x)),
    }
}

/// Median of a non-empty set of values, taking the midpoint of the two central values when the
/// count is even.
fn median_of(values: &[f64]) -> f64 {
    let mut array: Array1<N64> = values
        .iter()
        .filter(|x| !x.is_nan())
        .map(|x| n64(*x))
        .collect();
    array
        .quantile_mut(n64(0.5), &Midpoint)
        .map(|m| m.raw())
        .unwrap_or(f64::NAN)
}

/// Statistics of the valid cells of a region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub stdev: f64,
    /// Number of valid cells
    pub count: usize,
    /// Median
    pub median: f64,
    /// Median absolute deviation from the median, unscaled
    pub mad: f64,
}

impl Summary {
    /// Statistics of a region without valid cells.
    pub fn undefined() -> Self {
        Summary {
            mean: f64::NAN,
            stdev: f64::NAN,
            count: 0,
            median: f64::NAN,
            mad: f64::NAN,
        }
    }

    /// Compute statistics over every valid cell of `array`.
    ///
    /// # Arguments
    ///
    /// * `array`: Cells of any shape
    /// * `missing`: Optional description of missing data beyond NaN
    pub fn of<S, D>(array: &ArrayBase<S, D>, missing: Option<&Missing<f64>>) -> Self
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let filter = missing_filter(missing);
        let valid: Vec<f64> = array.iter().copied().filter(|x| filter(x)).collect();
        let view = ArrayView1::from(&valid);
        let Some(mean) = view.mean() else {
            return Self::undefined();
        };
        let count = valid.len();
        let stdev = view.std(0.0);
        let median = median_of(&valid);
        let deviations: Vec<f64> = valid.iter().map(|x| (x - median).abs()).collect();
        let mad = median_of(&deviations);
        Summary {
            mean,
            stdev,
            count,
            median,
            mad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-12,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn summary_1d() {
        let values = array![1.0, 2.0, 3.0, 4.0];
        let summary = Summary::of(&values, None);
        assert_eq!(4, summary.count);
        assert_close(2.5, summary.mean);
        assert_close(1.25_f64.sqrt(), summary.stdev);
        assert_close(2.5, summary.median);
        assert_close(1.0, summary.mad);
    }

    #[test]
    fn summary_odd_count() {
        let values = array![7.0, 1.0, 3.0];
        let summary = Summary::of(&values, None);
        assert_eq!(3, summary.count);
        assert_close(3.0, summary.median);
        assert_close(2.0, summary.mad);
    }

    #[test]
    fn summary_single_value() {
        let values = array![[[12.5]]];
        let summary = Summary::of(&values, None);
        assert_eq!(1, summary.count);
        assert_eq!(12.5, summary.mean);
        assert_eq!(0.0, summary.stdev);
        assert_eq!(12.5, summary.median);
        assert_eq!(0.0, summary.mad);
    }

    #[test]
    fn summary_skips_nan() {
        let values = array![[1.0, f64::NAN], [3.0, f64::NAN]];
        let summary = Summary::of(&values, None);
        assert_eq!(2, summary.count);
        assert_close(2.0, summary.mean);
        assert_close(1.0, summary.stdev);
        assert_close(2.0, summary.median);
    }

    #[test]
    fn summary_all_nan() {
        let values = Array3::from_elem((2, 2, 2), f64::NAN);
        let summary = Summary::of(&values, None);
        assert_eq!(0, summary.count);
        assert!(summary.mean.is_nan());
        assert!(summary.stdev.is_nan());
        assert!(summary.median.is_nan());
        assert!(summary.mad.is_nan());
    }

    #[test]
    fn summary_empty() {
        let values = Array3::<f64>::zeros((0, 3, 3));
        let summary = Summary::of(&values, None);
        assert_eq!(0, summary.count);
        assert!(summary.mean.is_nan());
    }

    #[test]
    fn summary_missing_value() {
        let values = array![-999.0, 10.0, 20.0, -999.0];
        let missing = Missing::MissingValue(-999.0);
        let summary = Summary::of(&values, Some(&missing));
        assert_eq!(2, summary.count);
        assert_close(15.0, summary.mean);
    }

    #[test]
    fn summary_valid_range() {
        let values = array![-5.0, 10.0, 20.0, 50.0];
        let missing = Missing::ValidRange(0.0, 40.0);
        let summary = Summary::of(&values, Some(&missing));
        assert_eq!(2, summary.count);
        assert_close(15.0, summary.median);
    }

    #[test]
    fn summary_of_view() {
        let values = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let column = values.column(1);
        let summary = Summary::of(&column, None);
        assert_eq!(2, summary.count);
        assert_close(3.5, summary.mean);
    }
}
