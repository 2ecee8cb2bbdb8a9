//! Statistics
//!
//! - `local`: per-partition sums computed by each worker
//! - `serial`: single-threaded reference used to check a parallel result
//!
//! # Example
//!
//! ```
//! use treestat::stats::{local, Moments};
//!
//! let values = [1.0f32, 2.0, 3.0, 4.0];
//! let n = values.len() as f64;
//! let mean = local::local_sum(&values) / n;
//! let moments = Moments::from_sums(n, local::local_sum(&values), local::local_sum_of_squares(&values));
//! assert_eq!(moments.mean, mean);
//! assert_eq!(moments.variance, 1.25);
//! ```

pub mod local;
pub mod serial;

use serde::Serialize;

/// Mean and population variance of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
}

impl Moments {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    /// Mean from a global sum
    #[inline]
    pub fn mean_from_sum(count: f64, sum: f64) -> f64 {
        sum / count
    }

    /// Variance as `E[x^2] - mean^2`
    #[inline]
    pub fn variance_from_sum_of_squares(count: f64, sum_of_squares: f64, mean: f64) -> f64 {
        sum_of_squares / count - mean * mean
    }

    pub fn from_sums(count: f64, sum: f64, sum_of_squares: f64) -> Self {
        let mean = Self::mean_from_sum(count, sum);
        Self {
            mean,
            variance: Self::variance_from_sum_of_squares(count, sum_of_squares, mean),
        }
    }

    /// Bitwise equality, for checking replicated results
    pub fn bit_identical(&self, other: &Moments) -> bool {
        self.mean.to_bits() == other.mean.to_bits()
            && self.variance.to_bits() == other.variance.to_bits()
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}
