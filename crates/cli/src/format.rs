//! Report → human-readable string formatting

use cadastre_engine::{ImportReport, PipelineReport, ValidationReport};
use cadastre_store::ReconcileReport;

/// Format a validation checklist
pub fn format_validation(report: &ValidationReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        if check.valid {
            out.push_str(&format!("  [ok]   {}\n", check.check));
        } else {
            out.push_str(&format!(
                "  [FAIL] {}: {}\n",
                check.check,
                check.detail.as_deref().unwrap_or("")
            ));
        }
    }
    out.push_str(if report.is_valid() {
        "checklist passed\n"
    } else {
        "checklist FAILED\n"
    });
    out
}

/// Format a pipeline run report
pub fn format_pipeline(report: &PipelineReport) -> String {
    let mut out = report.to_string();
    if report.is_fatal() {
        out.push_str("pipeline FAILED\n");
    } else if report.warnings().is_empty() {
        out.push_str("pipeline completed\n");
    } else {
        out.push_str(&format!(
            "pipeline completed with {} warning(s)\n",
            report.warnings().len()
        ));
    }
    out
}

/// Format a reconcile/post report
pub fn format_reconcile(report: &ReconcileReport) -> String {
    let mut out = format!(
        "branch {}: {} row(s) posted, {} conflict(s) resolved in favor of the edit\n",
        report.branch,
        report.posted,
        report.conflicts.len()
    );
    for line in &report.log {
        out.push_str(&format!("  {line}\n"));
    }
    out
}

/// Format a point-import report
pub fn format_import(report: &ImportReport) -> String {
    let mut out = format!(
        "{} updated, {} created, {} unmatched, {} conflict(s)\n",
        report.updated,
        report.created,
        report.matching.unmatched.len(),
        report.matching.conflicts.len()
    );
    if let Some(d) = report.matching.optimal_matching_distance() {
        out.push_str(&format!("optimal matching distance: {d} m\n"));
    }
    for conflict in &report.matching.conflicts {
        out.push_str(&format!(
            "  conflict: source {} has {} candidates\n",
            conflict.source,
            conflict.candidates.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_engine::PhaseOutcome;

    #[test]
    fn test_format_pipeline_mentions_warnings() {
        let mut report = PipelineReport::begin();
        report.record("retire_fronts", PhaseOutcome::Warning(vec!["x".into()]));
        let text = format_pipeline(&report);
        assert!(text.contains("1 warning"));
    }

    #[test]
    fn test_format_reconcile() {
        let report = ReconcileReport {
            branch: "15_2024_surveyor_1".to_string(),
            conflicts: Vec::new(),
            posted: 4,
            log: vec!["parcels: 4 rows".to_string()],
        };
        let text = format_reconcile(&report);
        assert!(text.contains("4 row(s) posted"));
        assert!(text.contains("parcels: 4 rows"));
    }
}
