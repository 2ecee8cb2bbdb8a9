//! Human-readable text output

use super::Report;
use std::fmt::Write;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Render the text report
///
/// Displays:
/// - Mean, variance and standard deviation
/// - Group shape (workers, values per worker, tree rounds)
/// - Elapsed time of the parallel computation
/// - Serial check result (if run)
/// - Messages exchanged
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_text(&mut out, report);
    out
}

fn write_text(out: &mut String, report: &Report) -> std::fmt::Result {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "                    TREESTAT RESULTS")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;

    writeln!(out, "Mean:      {}", report.mean)?;
    writeln!(out, "Variance:  {}", report.variance)?;
    writeln!(out, "Std dev:   {}", report.std_dev)?;
    writeln!(out)?;

    writeln!(out, "Group:")?;
    writeln!(out, "  Workers:     {}", report.workers)?;
    writeln!(out, "  Values:      {} ({} per worker)", report.elements, report.block_size)?;
    writeln!(out, "  Tree rounds: {}", report.tree_rounds)?;
    writeln!(out, "  Elapsed:     {}", report.elapsed.human)?;
    writeln!(out)?;

    if let Some(check) = &report.serial_check {
        writeln!(out, "Serial check:")?;
        writeln!(
            out,
            "  Mean:      {} (relative error {:.3e})",
            check.reference.mean, check.mean_error
        )?;
        writeln!(
            out,
            "  Variance:  {} (relative error {:.3e})",
            check.reference.variance, check.variance_error
        )?;
        writeln!(
            out,
            "  Result:    {} (tolerance {:e})",
            if check.passed { "PASS" } else { "FAIL" },
            check.tolerance
        )?;
        writeln!(out)?;
    }

    let t = &report.traffic;
    writeln!(out, "Messages:")?;
    writeln!(out, "  Block size:   {}", t.block_size)?;
    writeln!(out, "  Block:        {}", t.block)?;
    writeln!(out, "  Contribution: {}", t.contribution)?;
    writeln!(out, "  Reduce done:  {}", t.reduce_done)?;
    writeln!(out, "  Scalar:       {}", t.scalar)?;
    writeln!(out, "  Total:        {}", t.total())?;
    writeln!(out, "{}", RULE)
}
