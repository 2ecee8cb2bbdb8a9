//! CLI argument parsing using clap

use super::{DatasetFormat, OutputFormat};
use clap::Parser;
use std::path::PathBuf;

/// treestat - parallel mean and variance with a binary-tree broadcast
#[derive(Parser, Debug)]
#[command(name = "treestat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Dataset file (read by the coordinator only)
    #[arg(value_name = "PATH")]
    pub dataset: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    // === Group Options ===
    /// Number of workers (power of 2, at most 256)
    #[arg(short = 'w', long, env = "TREESTAT_WORKERS")]
    pub workers: Option<usize>,

    /// Largest partition a worker may allocate (e.g., 64M, 1G)
    #[arg(long)]
    pub max_partition: Option<String>,

    // === Dataset Options ===
    /// Dataset file encoding
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<DatasetFormat>,

    /// Generate this many normally distributed values instead of reading a file
    #[arg(long, value_name = "COUNT")]
    pub synthetic: Option<usize>,

    /// Seed for --synthetic
    #[arg(long)]
    pub seed: Option<u64>,

    /// Mean of the synthetic distribution
    #[arg(long, allow_negative_numbers = true)]
    pub synthetic_mean: Option<f64>,

    /// Standard deviation of the synthetic distribution
    #[arg(long)]
    pub synthetic_stddev: Option<f64>,

    // === Check Options ===
    /// Relative tolerance for the serial check
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Skip the serial check
    #[arg(long)]
    pub no_serial_check: bool,

    // === Output Options ===
    /// Report format
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    ///
    /// Only catches combinations clap cannot; value ranges are checked on the
    /// merged configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dataset.is_some() && self.synthetic.is_some() {
            anyhow::bail!("give either a dataset path or --synthetic, not both");
        }

        let synthetic_tuning = self.seed.is_some()
            || self.synthetic_mean.is_some()
            || self.synthetic_stddev.is_some();
        if synthetic_tuning && self.synthetic.is_none() && self.config.is_none() {
            anyhow::bail!("--seed, --synthetic-mean and --synthetic-stddev require --synthetic");
        }

        if self.output_file.is_some() && self.dry_run {
            anyhow::bail!("--output-file has no effect with --dry-run");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("treestat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_basic() {
        let cli = parse(&["data.txt", "-w", "8", "--format", "binary", "-o", "json"]);
        assert_eq!(cli.dataset, Some(PathBuf::from("data.txt")));
        assert_eq!(cli.workers, Some(8));
        assert_eq!(cli.format, Some(DatasetFormat::Binary));
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_parse_synthetic() {
        let cli = parse(&["--synthetic", "1024", "--seed", "9", "--synthetic-mean", "-3.5"]);
        assert_eq!(cli.synthetic, Some(1024));
        assert_eq!(cli.seed, Some(9));
        assert_eq!(cli.synthetic_mean, Some(-3.5));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_two_sources() {
        let cli = parse(&["data.txt", "--synthetic", "16"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_orphan_seed() {
        let cli = parse(&["data.txt", "--seed", "3"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_invalid_format_is_a_parse_error() {
        let result = Cli::try_parse_from(["treestat", "--format", "csv"]);
        assert!(result.is_err());
    }
}
