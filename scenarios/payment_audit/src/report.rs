use anyhow::Context;
use load_audit_runner::prelude::{
    render_metrics_table, render_phase_table, render_traffic_class_table, write_audit_report,
    AuditReport, AuditStatus, AuditResult,
};
use std::path::{Path, PathBuf};

/// Print the audit to stdout.
pub fn print_report(report: &AuditReport) {
    let summary = &report.summary;

    println!("\nAudit {} started at {}", report.run_id, report.started_at);
    println!("{}", render_phase_table(&report.phases));

    if !report.performance.is_empty() {
        println!("\nLoad tests");
        println!("{}", render_metrics_table(&report.performance));
        println!("{}", render_traffic_class_table(&report.performance));
    }

    if let Some(monitoring) = &summary.monitoring {
        println!(
            "\nMonitored {} samples over {:.1}s: {:.0}ms average response, {:.2}% errors, {:.1}MB memory, {} alert(s)",
            monitoring.sample_count,
            monitoring.span_ms as f64 / 1000.0,
            monitoring.avg_response_time,
            monitoring.avg_error_rate_pct,
            monitoring.avg_memory_usage_mb,
            summary.alerts_raised
        );
    }

    println!(
        "\nOverall: {} with score {:.1} (functional {:.1}, security {:.1}, performance {:.1}{})",
        summary.overall_status,
        summary.overall_score,
        summary.functional_score,
        summary.security_score,
        summary.performance_score,
        summary
            .performance_grade
            .map(|grade| format!(", grade {grade}"))
            .unwrap_or_default()
    );
    println!(
        "Ran {} tests in {:.1} minutes, {} failed",
        summary.total_tests, summary.execution_time_minutes, summary.total_failed
    );

    println!("\nRecommendations:");
    for recommendation in &summary.recommendations {
        println!("  - {recommendation}");
    }
    println!("\nNext audit due {}", summary.next_audit_date.format("%Y-%m-%d"));
}

/// Write the report as JSON into `dir`, creating the directory if needed.
pub fn write_report(report: &AuditReport, dir: &Path) -> AuditResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    let path = write_audit_report(report, dir)
        .with_context(|| format!("Failed to write audit report to {}", dir.display()))?;

    log::info!("Wrote audit report to {}", path.display());
    Ok(path)
}

/// Non-zero only when the audit failed.
pub fn exit_code(status: AuditStatus) -> u8 {
    match status {
        AuditStatus::Fail => 1,
        AuditStatus::Pass | AuditStatus::Warning => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use load_audit_runner::prelude::{load_audit_report, ScoreCalculator};

    fn report() -> AuditReport {
        let summary = ScoreCalculator::default().score(&[]);
        AuditReport {
            run_id: "run-1".to_string(),
            started_at: summary.next_audit_date,
            summary,
            phases: Vec::new(),
            performance: Vec::new(),
        }
    }

    #[test]
    fn report_is_written_into_a_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports");

        let report = report();
        let path = write_report(&report, &nested).unwrap();

        let loaded = load_audit_report(std::fs::File::open(path).unwrap()).unwrap();
        assert_eq!(report, loaded);
    }

    #[test]
    fn only_failures_exit_non_zero() {
        assert_eq!(1, exit_code(AuditStatus::Fail));
        assert_eq!(0, exit_code(AuditStatus::Warning));
        assert_eq!(0, exit_code(AuditStatus::Pass));
    }
}
