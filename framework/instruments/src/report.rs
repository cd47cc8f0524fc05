mod metrics_table;

use crate::report::metrics_table::{MetricsRow, PhaseRow, TrafficClassRow};
use load_audit_summary_model::{AuditPhaseResult, PerformanceMetrics};
use tabled::settings::Style;
use tabled::Table;

/// Render one row per load test run.
pub fn render_metrics_table(metrics: &[PerformanceMetrics]) -> String {
    let rows = metrics
        .iter()
        .map(|m| MetricsRow {
            test_name: m.test_name.clone(),
            total_requests: m.total_requests,
            error_rate_pct: m.error_rate,
            avg_time_ms: m.avg_response_time,
            p50_time_ms: m.p50_response_time,
            p95_time_ms: m.p95_response_time,
            p99_time_ms: m.p99_response_time,
            max_time_ms: m.max_response_time,
            throughput_rps: m.throughput,
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Render one row per traffic class of each load test run.
pub fn render_traffic_class_table(metrics: &[PerformanceMetrics]) -> String {
    let rows = metrics
        .iter()
        .flat_map(|m| {
            m.by_traffic_class
                .iter()
                .map(|(traffic_class, stats)| TrafficClassRow {
                    test_name: m.test_name.clone(),
                    traffic_class: traffic_class.clone(),
                    total_requests: stats.total_requests,
                    error_rate_pct: stats.error_rate,
                    avg_time_ms: stats.avg_response_time,
                    p95_time_ms: stats.p95_response_time,
                })
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Render the pass/fail tally of each audit phase.
pub fn render_phase_table(phases: &[AuditPhaseResult]) -> String {
    let rows = phases
        .iter()
        .map(|p| PhaseRow {
            phase: p.phase.to_string(),
            name: p.phase_name.clone(),
            tests_run: p.tests_run,
            passed: p.tests_passed,
            failed: p.tests_failed,
            critical: p.severity_counts.critical,
            high: p.severity_counts.high,
            medium: p.severity_counts.medium,
            low: p.severity_counts.low,
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}
