//! Configuration validation

use super::*;
use crate::topology::ProcessTopology;
use anyhow::{Context, Result};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_run(&config.run)?;
    validate_dataset(&config.dataset)?;
    validate_output(&config.output)?;

    Ok(())
}

/// Validate worker group settings
pub fn validate_run(run: &RunConfig) -> Result<()> {
    ProcessTopology::new(run.workers).context("Invalid worker count")?;

    if !run.tolerance.is_finite() || run.tolerance <= 0.0 {
        anyhow::bail!("tolerance must be a positive number, got {}", run.tolerance);
    }

    if run.max_partition_bytes == Some(0) {
        anyhow::bail!("max_partition_bytes must be greater than 0");
    }

    Ok(())
}

/// Validate the dataset source
pub fn validate_dataset(dataset: &DatasetConfig) -> Result<()> {
    match (&dataset.path, &dataset.synthetic) {
        (Some(_), Some(_)) => {
            anyhow::bail!("dataset.path and dataset.synthetic are mutually exclusive")
        }
        (None, None) => anyhow::bail!("No dataset specified (give a path or --synthetic)"),
        (Some(path), None) => {
            if path.as_os_str().is_empty() {
                anyhow::bail!("dataset.path must not be empty");
            }
        }
        (None, Some(synthetic)) => validate_synthetic(synthetic)?,
    }

    Ok(())
}

/// Validate the report destination
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if let Some(ref path) = output.path {
        if path.as_os_str().is_empty() {
            anyhow::bail!("output path must not be empty");
        }
        if path.is_dir() {
            anyhow::bail!("output path {} is a directory", path.display());
        }
    }

    Ok(())
}

fn validate_synthetic(synthetic: &SyntheticConfig) -> Result<()> {
    if synthetic.count == 0 {
        anyhow::bail!("synthetic count must be greater than 0");
    }
    if !synthetic.mean.is_finite() {
        anyhow::bail!("synthetic mean must be finite, got {}", synthetic.mean);
    }
    if !synthetic.stddev.is_finite() || synthetic.stddev < 0.0 {
        anyhow::bail!(
            "synthetic stddev must be a finite non-negative number, got {}",
            synthetic.stddev
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyError;

    fn synthetic_config(workers: usize) -> Config {
        let mut config = Config::default();
        config.run.workers = workers;
        config.dataset.synthetic = Some(SyntheticConfig { count: 64, seed: 1, mean: 0.0, stddev: 1.0 });
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&synthetic_config(4)).is_ok());
        assert!(validate_config(&synthetic_config(256)).is_ok());

        let mut config = Config::default();
        config.dataset.path = Some(PathBuf::from("data.txt"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_worker_counts() {
        for workers in [0, 3, 6, 512] {
            let err = validate_config(&synthetic_config(workers)).unwrap_err();
            assert!(
                matches!(err.downcast_ref::<TopologyError>(), Some(TopologyError::InvalidTopology { .. })),
                "workers = {workers}: {err:#}"
            );
        }
    }

    #[test]
    fn test_invalid_tolerance() {
        for tolerance in [0.0, -1e-3, f64::NAN, f64::INFINITY] {
            let mut config = synthetic_config(2);
            config.run.tolerance = tolerance;
            assert!(validate_config(&config).is_err(), "tolerance {tolerance}");
        }
    }

    #[test]
    fn test_zero_partition_limit() {
        let mut config = synthetic_config(2);
        config.run.max_partition_bytes = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_dataset_sources() {
        let mut config = synthetic_config(2);
        config.dataset.path = Some(PathBuf::from("data.txt"));
        assert!(validate_config(&config).is_err());

        config.dataset.path = None;
        config.dataset.synthetic = None;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_output_path_is_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = synthetic_config(2);
        config.output.path = Some(dir.path().to_path_buf());
        assert!(validate_config(&config).is_err());

        config.output.path = Some(dir.path().join("report.txt"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_synthetic() {
        let mut config = synthetic_config(2);
        config.dataset.synthetic = Some(SyntheticConfig { count: 0, seed: 1, mean: 0.0, stddev: 1.0 });
        assert!(validate_config(&config).is_err());

        config.dataset.synthetic = Some(SyntheticConfig { count: 8, seed: 1, mean: 0.0, stddev: -2.0 });
        assert!(validate_config(&config).is_err());
    }
}
