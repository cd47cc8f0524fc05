mod audit;
mod metrics;
mod monitor;

pub use audit::{
    AuditPhaseResult, AuditStatus, AuditSummary, Grade, PhaseDetail, PhaseIssue, PhaseKind,
    Severity, SeverityCounts,
};
pub use load_test::{LoadTestConfig, OutcomeFault, RequestOutcome, MAX_REQUESTS_PER_USER};
pub use metrics::{PerformanceMetrics, TrafficClassStats};
pub use monitor::{AlertEvent, AlertKind, MonitorSummary, RealTimeSample};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Everything an audit produced, handed to the reporting side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditReport {
    /// The unique run id
    ///
    /// Chosen by the orchestrator. Unique for each audit.
    pub run_id: String,
    /// The time the audit started
    pub started_at: DateTime<Utc>,
    pub summary: AuditSummary,
    /// Per-phase results in the order the phases ran
    pub phases: Vec<AuditPhaseResult>,
    /// Metrics for every load test that ran, in the order they ran
    pub performance: Vec<PerformanceMetrics>,
}

/// Serialize the report to a writer as pretty printed JSON
pub fn store_audit_report<W: Write>(report: &AuditReport, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Load a report from a reader
pub fn load_audit_report<R: Read>(reader: R) -> anyhow::Result<AuditReport> {
    let reader = std::io::BufReader::new(reader);
    let report: AuditReport = serde_json::from_reader(reader)?;
    Ok(report)
}

/// Write the report to a new file in `dir`
///
/// The file is named `audit-report-<started_at>.json`. An existing file is never overwritten.
pub fn write_audit_report(report: &AuditReport, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!(
        "audit-report-{}.json",
        report.started_at.format("%Y-%m-%dT%H.%M.%S%.fZ")
    ));
    let mut file = std::fs::File::create_new(&path)?;
    store_audit_report(report, &mut file)?;
    let _ = file.write("\n".as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> AuditReport {
        let started_at = DateTime::parse_from_rfc3339("2024-05-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut functional = AuditPhaseResult::new(PhaseKind::Functional, "Frontend");
        functional.record_pass();
        functional.record_fail(Severity::Medium, "Form validation message missing");

        AuditReport {
            run_id: "abc123".to_string(),
            started_at,
            summary: AuditSummary {
                overall_status: AuditStatus::Warning,
                overall_score: 80.0,
                functional_score: 50.0,
                security_score: 100.0,
                performance_score: 100.0,
                performance_grade: None,
                execution_time_minutes: 0.5,
                total_tests: 2,
                total_passed: 1,
                total_failed: 1,
                severity_counts: functional.severity_counts,
                recommendations: vec!["Fix the form".to_string()],
                next_audit_date: started_at + chrono::Duration::days(14),
                monitoring: None,
                alerts_raised: 0,
            },
            phases: vec![functional],
            performance: vec![],
        }
    }

    #[test]
    fn report_survives_storage() {
        let report = sample_report();
        let mut buf = Vec::new();
        store_audit_report(&report, &mut buf).unwrap();

        let loaded = load_audit_report(buf.as_slice()).unwrap();
        pretty_assertions::assert_eq!(report, loaded);
    }

    #[test]
    fn write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();

        let path = write_audit_report(&report, dir.path()).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("audit-report-2024-05-01T09.30.00"));

        assert!(write_audit_report(&report, dir.path()).is_err());
    }
}
