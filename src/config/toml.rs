//! TOML configuration file parsing
//!
//! ```toml
//! [run]
//! workers = 8
//! tolerance = 1e-5
//! max_partition_bytes = 67108864
//!
//! [dataset]
//! path = "data/values.bin"
//! format = "binary"
//!
//! [output]
//! format = "json"
//! path = "report.json"
//! ```

use super::cli::Cli;
use super::cli_convert::parse_size;
use super::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Group settings
    if let Some(workers) = cli.workers {
        config.run.workers = workers;
    }
    if let Some(tolerance) = cli.tolerance {
        config.run.tolerance = tolerance;
    }
    if cli.no_serial_check {
        config.run.serial_check = false;
    }
    if let Some(ref limit) = cli.max_partition {
        config.run.max_partition_bytes = Some(parse_size(limit).context("Invalid --max-partition")?);
    }

    // Dataset source: a source given on the command line replaces the file's
    if let Some(ref path) = cli.dataset {
        config.dataset.path = Some(path.clone());
        config.dataset.synthetic = None;
    }
    if let Some(count) = cli.synthetic {
        config.dataset.path = None;
        config.dataset.synthetic = Some(SyntheticConfig {
            count,
            seed: default_seed(),
            mean: 0.0,
            stddev: default_stddev(),
        });
    }
    if let Some(ref mut synthetic) = config.dataset.synthetic {
        if let Some(seed) = cli.seed {
            synthetic.seed = seed;
        }
        if let Some(mean) = cli.synthetic_mean {
            synthetic.mean = mean;
        }
        if let Some(stddev) = cli.synthetic_stddev {
            synthetic.stddev = stddev;
        }
    }
    if let Some(format) = cli.format {
        config.dataset.format = format;
    }

    // Output
    if let Some(format) = cli.output {
        config.output.format = format;
    }
    if let Some(ref path) = cli.output_file {
        config.output.path = Some(path.clone());
    }

    Ok(config)
}
