use crate::report::{millis, Comparison, RunReport};
use std::fmt::Write;

/// Plain-text summary of a run: start time, per-phase and per-unit
/// timings, finish time, per-unit average, and total
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Run: {} copies, {} workers, {} io path, {} buffering",
        report.copies,
        report.workers,
        report.io_path,
        report.buffering
    );
    let _ = writeln!(out, "Source: {} bytes", report.source_bytes);
    let _ = writeln!(out, "Started (TI): {} ms", report.started_at_ms);
    out.push('\n');

    for phase in &report.phases {
        let _ = writeln!(
            out,
            "Phase {} - {}: {:.3} ms ({} failed, {} skipped)",
            phase.phase.number(),
            phase.phase,
            millis(phase.wall),
            phase.failed,
            phase.skipped
        );
        for result in &phase.results {
            let _ = write!(
                out,
                "  unit {:02}: {:>10.3} ms  {}",
                result.index,
                millis(result.elapsed),
                result.outcome
            );
            if let Some(detail) = &result.detail {
                let _ = write!(out, " ({})", detail);
            }
            out.push('\n');
        }
    }
    out.push('\n');

    let _ = writeln!(out, "Finished (TFIN): {} ms", report.finished_at_ms);
    let _ = writeln!(out, "Average per unit (TPPA): {:.3} ms", millis(report.average_per_unit));
    let _ = writeln!(out, "Total (TT): {:.3} ms", millis(report.total));

    let counts = &report.outcomes;
    let _ = writeln!(
        out,
        "Outcomes: {} ok, {} hash mismatch, {} content mismatch, {} io failure",
        counts.success, counts.hash_mismatch, counts.content_mismatch, counts.io_failure
    );

    out
}

/// Both runs followed by the difference between their totals
pub fn render_comparison(cmp: &Comparison) -> String {
    let mut out = String::new();

    out.push_str("=== Baseline ===\n");
    out.push_str(&render_report(&cmp.baseline));
    out.push_str("\n=== Optimized ===\n");
    out.push_str(&render_report(&cmp.optimized));
    out.push('\n');

    let _ = writeln!(out, "Difference (DF): {:.3} ms", cmp.difference_ms);
    let _ = writeln!(out, "Improvement (PM): {:.2}%", cmp.improvement_pct);

    out
}
