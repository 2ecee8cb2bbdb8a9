//! Per-partition aggregation
//!
//! Pure functions over one worker's partition. Values are widened to `f64`
//! before accumulating.

/// Arithmetic sum of the partition
pub fn local_sum(partition: &[f32]) -> f64 {
    partition.iter().map(|&v| v as f64).sum()
}

/// Sum of the squares of the partition's values
pub fn local_sum_of_squares(partition: &[f32]) -> f64 {
    partition
        .iter()
        .map(|&v| {
            let v = v as f64;
            v * v
        })
        .sum()
}
