//! JSON output formatting

use super::{format_duration_human, Report};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Pretty-printed JSON report, newline terminated
pub fn render_json(report: &Report) -> Result<String> {
    let mut rendered = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    rendered.push('\n');
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::{passing_check, sample_report};
    use serde_json::Value;

    #[test]
    fn test_json_duration() {
        let d = JsonDuration::from_duration(Duration::from_micros(1500));
        assert_eq!(d, JsonDuration { micros: 1500, human: "1.500ms".to_string() });
    }

    #[test]
    fn test_render_json_fields() {
        let rendered = render_json(&sample_report(Some(passing_check()))).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["hostname"], "node01");
        assert_eq!(value["workers"], 4);
        assert_eq!(value["elements"], 8);
        assert_eq!(value["tree_rounds"], 2);
        assert_eq!(value["mean"], 4.5);
        assert_eq!(value["variance"], 5.25);
        assert_eq!(value["elapsed"]["micros"], 1500);
        assert_eq!(value["serial_check"]["passed"], true);
        assert_eq!(value["serial_check"]["reference"]["mean"], 4.5);
        assert_eq!(value["traffic"]["scalar"], 6);
    }

    #[test]
    fn test_render_json_omits_skipped_check() {
        let value: Value = serde_json::from_str(&render_json(&sample_report(None)).unwrap()).unwrap();
        assert!(value.get("serial_check").is_none());
    }
}
