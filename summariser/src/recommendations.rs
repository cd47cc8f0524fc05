use crate::score::PerformanceOverview;
use load_audit_summary_model::{AuditPhaseResult, Grade, Severity};

const RESPONSE_TIME_TARGET_MS: f64 = 3000.0;
const SUCCESS_RATE_TARGET: f64 = 95.0;
const SECURITY_SCORE_TARGET: f64 = 85.0;

/// Build the list of follow-up actions for an audit.
pub(crate) fn recommend(
    phase_results: &[AuditPhaseResult],
    security_score: f64,
    performance: Option<&PerformanceOverview>,
    alerts_raised: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    for result in phase_results {
        let counts = &result.severity_counts;

        if counts.critical > 0 {
            let first = first_issue(result, Severity::Critical).unwrap_or("see phase details");
            recommendations.push(format!(
                "Resolve {} critical issue(s) in the {} phase before release, starting with: {first}",
                counts.critical, result.phase_name
            ));
        }

        if counts.high > 0 {
            recommendations.push(format!(
                "Address {} high severity issue(s) in the {} phase",
                counts.high, result.phase_name
            ));
        }

        let minor = counts.medium + counts.low;
        if minor > 0 {
            recommendations.push(format!(
                "Review {minor} medium or low severity finding(s) in the {} phase",
                result.phase_name
            ));
        }

        for metrics in result.performance_metrics() {
            let grade = crate::grade(metrics.avg_response_time, metrics.success_rate());
            if grade == Grade::C {
                recommendations.push(format!(
                    "Load test [{}] graded {grade}: {:.0}ms average response at {:.1}% success",
                    metrics.test_name,
                    metrics.avg_response_time,
                    metrics.success_rate()
                ));
            }
        }
    }

    if security_score < SECURITY_SCORE_TARGET {
        recommendations.push(format!(
            "Raise the security score from {security_score:.0} to at least {SECURITY_SCORE_TARGET:.0}"
        ));
    }

    if let Some(performance) = performance {
        if performance.avg_response_time >= RESPONSE_TIME_TARGET_MS {
            recommendations.push(format!(
                "Reduce the average response time of {:.0}ms to below {RESPONSE_TIME_TARGET_MS:.0}ms",
                performance.avg_response_time
            ));
        }
        if performance.success_rate <= SUCCESS_RATE_TARGET {
            recommendations.push(format!(
                "Investigate request failures: success rate of {:.1}% is not above {SUCCESS_RATE_TARGET:.0}%",
                performance.success_rate
            ));
        }
    }

    if alerts_raised > 0 {
        recommendations.push(format!(
            "Investigate {alerts_raised} threshold alert(s) raised during real-time monitoring"
        ));
    }

    if recommendations.is_empty() {
        recommendations.push("No issues found, keep the regular audit schedule".to_string());
    }

    recommendations
}

fn first_issue(result: &AuditPhaseResult, severity: Severity) -> Option<&str> {
    result
        .issues
        .iter()
        .find(|issue| issue.severity == severity)
        .map(|issue| issue.message.as_str())
}
