//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file given with
//! `--config`, environment variables, command-line flags.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Worker group settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of workers (power of 2, at most 256)
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Relative tolerance for the serial check
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Recompute serially and compare after the parallel run
    #[serde(default = "default_serial_check")]
    pub serial_check: bool,
    /// Largest partition buffer a worker may allocate, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_partition_bytes: Option<u64>,
}

fn default_workers() -> usize {
    4
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_serial_check() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            tolerance: default_tolerance(),
            serial_check: default_serial_check(),
            max_partition_bytes: None,
        }
    }
}

/// Where the coordinator's dataset comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Data file path
    pub path: Option<PathBuf>,
    /// Data file encoding
    #[serde(default)]
    pub format: DatasetFormat,
    /// Generate values instead of reading a file
    pub synthetic: Option<SyntheticConfig>,
}

/// Data file encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// Whitespace or comma separated numbers
    #[default]
    Text,
    /// Packed little-endian f32
    Binary,
}

/// Seeded normal distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of values to generate
    pub count: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_stddev")]
    pub stddev: f64,
}

fn default_seed() -> u64 {
    42
}

fn default_stddev() -> f64 {
    1.0
}

/// Result reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write the report here instead of stdout
    pub path: Option<PathBuf>,
}

/// Report format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetFormat::Text => write!(f, "text"),
            DatasetFormat::Binary => write!(f, "binary"),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workers: {}", self.run.workers)?;
        match (&self.dataset.path, &self.dataset.synthetic) {
            (Some(path), _) => writeln!(f, "Dataset: {} ({})", path.display(), self.dataset.format)?,
            (None, Some(s)) => writeln!(
                f,
                "Dataset: synthetic, {} values ~ N({}, {}^2), seed {}",
                s.count, s.mean, s.stddev, s.seed
            )?,
            (None, None) => writeln!(f, "Dataset: (none)")?,
        }
        if self.run.serial_check {
            writeln!(f, "Serial check: on (tolerance {:e})", self.run.tolerance)?;
        } else {
            writeln!(f, "Serial check: off")?;
        }
        if let Some(limit) = self.run.max_partition_bytes {
            writeln!(f, "Partition limit: {} bytes", limit)?;
        }
        write!(f, "Output: {:?}", self.output.format)
    }
}

/// Build the effective configuration for a CLI invocation
pub fn load(cli: &cli::Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => toml::parse_toml_file(path)?,
        None => Config::default(),
    };
    toml::merge_cli_with_config(cli, base)
}
