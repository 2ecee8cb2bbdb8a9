//! Serial reference check
//!
//! Recomputes mean and variance on a single thread, using the two-pass
//! formula `sum((x - mean)^2) / n`, and compares it with a parallel result.
//! Agreement is judged by relative error; small differences are expected
//! because the parallel sum folds values in a different order.

use super::Moments;
use serde::Serialize;

/// Relative errors below this denominator are measured against it instead
const RELATIVE_FLOOR: f64 = 1e-9;

/// Single-threaded mean and two-pass variance
pub fn serial_moments(values: &[f32]) -> Moments {
    if values.is_empty() {
        return Moments::new(f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Moments::new(mean, variance)
}

/// `|actual - expected|` relative to `|expected|`
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    (actual - expected).abs() / expected.abs().max(RELATIVE_FLOOR)
}

/// Outcome of comparing a parallel result with the serial reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SerialCheck {
    pub reference: Moments,
    pub mean_error: f64,
    pub variance_error: f64,
    pub tolerance: f64,
    pub passed: bool,
}

impl SerialCheck {
    pub fn run(parallel: &Moments, values: &[f32], tolerance: f64) -> Self {
        let reference = serial_moments(values);
        let mean_error = relative_error(parallel.mean, reference.mean);
        let variance_error = relative_error(parallel.variance, reference.variance);
        Self {
            reference,
            mean_error,
            variance_error,
            tolerance,
            passed: mean_error <= tolerance && variance_error <= tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_worked_example() {
        let values: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        let moments = serial_moments(&values);
        assert_eq!(moments.mean, 4.5);
        assert_eq!(moments.variance, 5.25);
    }

    #[test]
    fn test_relative_error() {
        assert_eq!(relative_error(101.0, 100.0), 0.01);
        assert_eq!(relative_error(0.0, 0.0), 0.0);
        // Near zero the floor takes over
        assert!(relative_error(1e-15, 0.0) < 1e-4);
    }

    #[test]
    fn test_check_passes_within_tolerance() {
        let values = [2.0f32, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let parallel = Moments::new(5.0 * (1.0 + 1e-6), 4.0);
        let check = SerialCheck::run(&parallel, &values, 1e-4);
        assert!(check.passed);
        assert_eq!(check.reference, Moments::new(5.0, 4.0));
    }

    #[test]
    fn test_check_fails_outside_tolerance() {
        let values = [2.0f32, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let parallel = Moments::new(5.0, 4.01);
        let check = SerialCheck::run(&parallel, &values, 1e-4);
        assert!(!check.passed);
        assert!(check.variance_error > 1e-4);
    }

    #[test]
    fn test_constant_data_has_zero_variance() {
        let values = [3.25f32; 16];
        let moments = serial_moments(&values);
        assert_eq!(moments.mean, 3.25);
        assert_eq!(moments.variance, 0.0);
    }
}
