//! Dataset loading
//!
//! The dataset lives only at the coordinator. It is loaded once, before any
//! worker starts, and handed to the coordinating worker by value.
//!
//! Three sources are supported:
//!
//! - **Text**: numbers separated by whitespace or commas, `#` starts a comment
//! - **Binary**: packed little-endian `f32` values
//! - **Synthetic**: normally distributed values from a seeded generator

use crate::config::{DatasetConfig, DatasetFormat, SyntheticConfig};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Dataset load failures
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: '{token}' is not a number")]
    Parse {
        path: PathBuf,
        line: usize,
        token: String,
    },

    #[error("{path}: {len} bytes is not a whole number of 4-byte floats")]
    Truncated { path: PathBuf, len: usize },

    #[error("dataset is empty")]
    Empty,

    #[error("value {value} at index {index} is not finite")]
    NonFinite { index: usize, value: f32 },

    #[error("dataset of {len} values does not split evenly across {workers} workers")]
    Indivisible { len: usize, workers: usize },

    #[error("no dataset source configured (give a path or --synthetic)")]
    NoSource,

    #[error("invalid synthetic distribution: {0}")]
    Synthetic(String),
}

/// Immutable in-memory dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    values: Vec<f32>,
}

impl Dataset {
    /// Wrap `values`, rejecting empty input and non-finite values
    pub fn from_values(values: Vec<f32>) -> Result<Self, DatasetError> {
        if values.is_empty() {
            return Err(DatasetError::Empty);
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DatasetError::NonFinite { index, value });
        }
        Ok(Self { values })
    }

    /// Load the dataset described by `config`
    pub fn load(config: &DatasetConfig) -> Result<Self, DatasetError> {
        match (&config.path, &config.synthetic) {
            (Some(path), _) => Self::from_file(path, config.format),
            (None, Some(synthetic)) => Self::synthetic(synthetic),
            (None, None) => Err(DatasetError::NoSource),
        }
    }

    pub fn from_file(path: &Path, format: DatasetFormat) -> Result<Self, DatasetError> {
        match format {
            DatasetFormat::Text => {
                let contents = fs::read_to_string(path).map_err(|source| DatasetError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_values(parse_text(&contents, path)?)
            }
            DatasetFormat::Binary => {
                let bytes = fs::read(path).map_err(|source| DatasetError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_values(parse_binary(&bytes, path)?)
            }
        }
    }

    /// Generate `count` values drawn from `N(mean, stddev^2)`
    ///
    /// The same seed always yields the same dataset.
    pub fn synthetic(config: &SyntheticConfig) -> Result<Self, DatasetError> {
        // Normal::new only rejects non-finite deviations
        if !(config.stddev >= 0.0) {
            return Err(DatasetError::Synthetic(format!(
                "standard deviation must be non-negative, got {}",
                config.stddev
            )));
        }
        let normal = Normal::new(config.mean, config.stddev)
            .map_err(|e| DatasetError::Synthetic(e.to_string()))?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        let values = (0..config.count)
            .map(|_| normal.sample(&mut rng) as f32)
            .collect();
        Self::from_values(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check that the dataset splits into `workers` equal blocks
    pub fn check_divisible(&self, workers: usize) -> Result<usize, DatasetError> {
        if workers == 0 || self.len() % workers != 0 {
            return Err(DatasetError::Indivisible { len: self.len(), workers });
        }
        Ok(self.len() / workers)
    }
}

fn parse_text(contents: &str, path: &Path) -> Result<Vec<f32>, DatasetError> {
    let mut values = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        for token in line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
            let value: f32 = token.parse().map_err(|_| DatasetError::Parse {
                path: path.to_path_buf(),
                line: line_no + 1,
                token: token.to_string(),
            })?;
            values.push(value);
        }
    }
    Ok(values)
}

fn parse_binary(bytes: &[u8], path: &Path) -> Result<Vec<f32>, DatasetError> {
    if bytes.len() % 4 != 0 {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn text_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_text_with_comments_and_commas() {
        let file = text_file("# header\n1 2, 3\n4.5\t-6 # trailing\n\n7,8\n");
        let dataset = Dataset::from_file(file.path(), DatasetFormat::Text).unwrap();
        assert_eq!(dataset.values(), &[1.0, 2.0, 3.0, 4.5, -6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_load_text_reports_bad_token() {
        let file = text_file("1 2\n3 x4\n");
        let err = Dataset::from_file(file.path(), DatasetFormat::Text).unwrap_err();
        match err {
            DatasetError::Parse { line, token, .. } => {
                assert_eq!(line, 2);
                assert_eq!(token, "x4");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_binary() {
        let mut file = NamedTempFile::new().unwrap();
        for v in [1.5f32, -2.0, 8.25] {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        let dataset = Dataset::from_file(file.path(), DatasetFormat::Binary).unwrap();
        assert_eq!(dataset.values(), &[1.5, -2.0, 8.25]);
    }

    #[test]
    fn test_load_binary_truncated() {
        let file = text_file("abcdef");
        assert!(matches!(
            Dataset::from_file(file.path(), DatasetFormat::Binary),
            Err(DatasetError::Truncated { len: 6, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Dataset::from_file(Path::new("/nonexistent/treestat/data.txt"), DatasetFormat::Text)
            .unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert!(matches!(Dataset::from_values(vec![]), Err(DatasetError::Empty)));
        assert!(matches!(
            Dataset::from_values(vec![1.0, f32::INFINITY]),
            Err(DatasetError::NonFinite { index: 1, .. })
        ));
        let file = text_file("# nothing here\n");
        assert!(matches!(
            Dataset::from_file(file.path(), DatasetFormat::Text),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let config = SyntheticConfig { count: 1024, seed: 7, mean: 10.0, stddev: 2.0 };
        let a = Dataset::synthetic(&config).unwrap();
        let b = Dataset::synthetic(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1024);

        let mean = a.values().iter().map(|&v| v as f64).sum::<f64>() / 1024.0;
        assert!((mean - 10.0).abs() < 0.5, "mean {mean}");
    }

    #[test]
    fn test_synthetic_rejects_bad_stddev() {
        for stddev in [-1.0, -f64::MIN_POSITIVE, f64::NAN, f64::INFINITY] {
            let config = SyntheticConfig { count: 8, seed: 1, mean: 0.0, stddev };
            assert!(
                matches!(Dataset::synthetic(&config), Err(DatasetError::Synthetic(_))),
                "stddev {stddev}"
            );
        }

        let constant = SyntheticConfig { count: 4, seed: 1, mean: 3.0, stddev: 0.0 };
        assert_eq!(Dataset::synthetic(&constant).unwrap().values(), &[3.0; 4]);
    }

    #[test]
    fn test_check_divisible() {
        let dataset = Dataset::from_values((1..=8).map(|v| v as f32).collect()).unwrap();
        assert_eq!(dataset.check_divisible(4).unwrap(), 2);
        assert!(matches!(
            dataset.check_divisible(3),
            Err(DatasetError::Indivisible { len: 8, workers: 3 })
        ));
    }

    #[test]
    fn test_load_without_source() {
        let config = DatasetConfig::default();
        assert!(matches!(Dataset::load(&config), Err(DatasetError::NoSource)));
    }
}
