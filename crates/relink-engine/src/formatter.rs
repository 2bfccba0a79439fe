//! Text renderings of engine-side reports.

use crate::observability::RetryStatsReport;
use crate::snapshot::SnapshotStats;

/// ```text
/// Retry stats: 4 succeeded, 1 failed (80% success)
/// # stale_ref: 3
/// # not_interactable: 1
/// ```
pub fn format_stats_report(report: &RetryStatsReport) -> String {
    let mut output = format!(
        "Retry stats: {} succeeded, {} failed",
        report.succeeded, report.failed
    );
    if let Some(rate) = report.success_rate() {
        output.push_str(&format!(" ({:.0}% success)", rate * 100.0));
    }

    for (kind, count) in &report.attempts_by_kind {
        output.push_str(&format!("\n# {}: {}", kind, count));
    }
    output
}

pub fn format_snapshot_stats(stats: &SnapshotStats) -> String {
    format!(
        "{} lines, {} chars (~{} tokens), {} refs ({} interactive)",
        stats.lines, stats.chars, stats.estimated_tokens, stats.refs, stats.interactive
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relink_common::failure::FailureKind;

    #[test]
    fn stats_report() {
        let mut report = RetryStatsReport {
            succeeded: 4,
            failed: 1,
            ..Default::default()
        };
        report.attempts_by_kind.insert(FailureKind::NotInteractable, 1);
        report.attempts_by_kind.insert(FailureKind::StaleRef, 3);

        assert_eq!(
            format_stats_report(&report),
            "Retry stats: 4 succeeded, 1 failed (80% success)\n# stale_ref: 3\n# not_interactable: 1"
        );
    }

    #[test]
    fn snapshot_stats_line() {
        let stats = SnapshotStats {
            lines: 12,
            chars: 480,
            estimated_tokens: 120,
            refs: 7,
            interactive: 5,
        };
        assert_eq!(
            format_snapshot_stats(&stats),
            "12 lines, 480 chars (~120 tokens), 7 refs (5 interactive)"
        );
    }

    #[test]
    fn empty_report_has_no_rate() {
        assert_eq!(
            format_stats_report(&RetryStatsReport::default()),
            "Retry stats: 0 succeeded, 0 failed"
        );
    }
}
