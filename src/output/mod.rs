//! Result reporting
//!
//! The run produces exactly one [`Report`], written once by the coordinator
//! path after every worker has joined.

pub mod json;
pub mod text;

use crate::config::{OutputConfig, OutputFormat};
use crate::coordinator::RunOutcome;
use crate::distributed::TrafficSnapshot;
use crate::stats::serial::SerialCheck;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::time::Duration;

/// Everything a report shows about one run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: &'static str,
    pub hostname: Option<String>,
    pub generated_at: String,
    pub workers: usize,
    pub elements: usize,
    pub block_size: usize,
    pub tree_rounds: u32,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub elapsed: json::JsonDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_check: Option<SerialCheck>,
    pub traffic: TrafficSnapshot,
}

impl Report {
    pub fn new(outcome: &RunOutcome, serial_check: Option<SerialCheck>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            hostname: hostname::get().ok().map(|h| h.to_string_lossy().into_owned()),
            generated_at: chrono::Local::now().to_rfc3339(),
            workers: outcome.workers,
            elements: outcome.elements,
            block_size: outcome.block_size,
            tree_rounds: outcome.tree_rounds,
            mean: outcome.moments.mean,
            variance: outcome.moments.variance,
            std_dev: outcome.moments.std_dev(),
            elapsed: json::JsonDuration::from_duration(outcome.elapsed),
            serial_check,
            traffic: outcome.traffic,
        }
    }

    /// True unless a serial check ran and disagreed
    pub fn passed(&self) -> bool {
        self.serial_check.map_or(true, |check| check.passed)
    }
}

/// Render `report` in the configured format
pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render_text(report)),
        OutputFormat::Json => json::render_json(report),
    }
}

/// Write `report` to the configured destination
pub fn report(report: &Report, config: &OutputConfig) -> Result<()> {
    let rendered = render(report, config.format)?;
    match &config.path {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes()).context("Failed to write report")?;
            stdout.flush().context("Failed to write report")
        }
    }
}

/// Format duration in human-readable format
pub(crate) fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    }
}
