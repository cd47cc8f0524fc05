use crate::grade::{grade, response_time_band_score, success_rate_band_score};
use crate::recommendations::recommend;
use chrono::{DateTime, Utc};
use load_audit_summary_model::{
    AuditPhaseResult, AuditStatus, AuditSummary, Grade, MonitorSummary, PerformanceMetrics,
    PhaseKind, SeverityCounts,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Score weight [{name}] must be finite and not negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("At least one score weight must be positive")]
    AllWeightsZero,
    #[error("Default score [{name}] must be between 0 and 100, got {value}")]
    InvalidDefaultScore { name: &'static str, value: f64 },
}

/// Tunables for [ScoreCalculator].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScorePolicy {
    pub functional_weight: f64,
    pub security_weight: f64,
    pub performance_weight: f64,
    /// Functional score used when no tests ran at all.
    ///
    /// Defaults to 100 so that an audit with every checklist phase disabled is not scored as a
    /// total failure. Lower it to stop skipped phases from inflating the overall score.
    pub skipped_functional_score: f64,
    /// Security score used when no security phase reported a score
    pub skipped_security_score: f64,
    /// Performance score used when no load test produced metrics
    pub skipped_performance_score: f64,
    /// Overall scores below this produce a warning
    pub warning_below_score: f64,
    /// More high severity issues than this produce a warning
    pub max_high_severity: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            functional_weight: 0.4,
            security_weight: 0.4,
            performance_weight: 0.2,
            skipped_functional_score: 100.0,
            skipped_security_score: 100.0,
            skipped_performance_score: 100.0,
            warning_below_score: 85.0,
            max_high_severity: 2,
        }
    }
}

impl ScorePolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (name, value) in [
            ("functional_weight", self.functional_weight),
            ("security_weight", self.security_weight),
            ("performance_weight", self.performance_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::InvalidWeight { name, value });
            }
        }

        if self.functional_weight + self.security_weight + self.performance_weight <= 0.0 {
            return Err(PolicyError::AllWeightsZero);
        }

        for (name, value) in [
            ("skipped_functional_score", self.skipped_functional_score),
            ("skipped_security_score", self.skipped_security_score),
            ("skipped_performance_score", self.skipped_performance_score),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PolicyError::InvalidDefaultScore { name, value });
            }
        }

        Ok(())
    }

    fn weights_total(&self) -> f64 {
        self.functional_weight + self.security_weight + self.performance_weight
    }
}

/// When and how long the audit ran, used for the dated fields of the summary.
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext {
    pub completed_at: DateTime<Utc>,
    pub execution_time: Duration,
}

impl ScoreContext {
    pub fn now() -> Self {
        Self {
            completed_at: Utc::now(),
            execution_time: Duration::ZERO,
        }
    }
}

/// Load test metrics folded across every run of an audit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceOverview {
    /// Mean response time of successful requests, weighted by request count
    pub avg_response_time: f64,
    /// Percentage of all requests that succeeded
    pub success_rate: f64,
    pub total_requests: u64,
}

impl PerformanceOverview {
    pub fn from_metrics(metrics: &[&PerformanceMetrics]) -> Option<Self> {
        if metrics.is_empty() {
            return None;
        }

        let total_requests = metrics.iter().map(|m| m.total_requests).sum::<u64>();
        let successful = metrics.iter().map(|m| m.successful_requests).sum::<u64>();
        let weighted_latency = metrics
            .iter()
            .map(|m| m.avg_response_time * m.successful_requests as f64)
            .sum::<f64>();

        Some(Self {
            avg_response_time: if successful > 0 {
                weighted_latency / successful as f64
            } else {
                0.0
            },
            success_rate: if total_requests > 0 {
                successful as f64 / total_requests as f64 * 100.0
            } else {
                100.0
            },
            total_requests,
        })
    }

    pub fn grade(&self) -> Grade {
        grade(self.avg_response_time, self.success_rate)
    }

    /// The mean of the response time and success rate band scores.
    pub fn score(&self) -> f64 {
        (response_time_band_score(self.avg_response_time)
            + success_rate_band_score(self.success_rate))
            / 2.0
    }
}

/// Folds the results of every audit phase into one [AuditSummary].
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    policy: ScorePolicy,
}

impl ScoreCalculator {
    pub fn new(policy: ScorePolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    /// Score the phase results as of now.
    pub fn score(&self, phase_results: &[AuditPhaseResult]) -> AuditSummary {
        self.score_at(phase_results, ScoreContext::now())
    }

    /// Score the phase results. Total over any input, including no phases at all.
    pub fn score_at(&self, phase_results: &[AuditPhaseResult], context: ScoreContext) -> AuditSummary {
        self.score_monitored(phase_results, context, None, 0)
    }

    /// Score the phase results together with what the real-time monitor observed.
    ///
    /// Monitoring does not change the scores. Alerts only add a recommendation.
    pub fn score_monitored(
        &self,
        phase_results: &[AuditPhaseResult],
        context: ScoreContext,
        monitoring: Option<MonitorSummary>,
        alerts_raised: usize,
    ) -> AuditSummary {
        let total_tests = phase_results.iter().map(|r| r.tests_run).sum::<u32>();
        let total_passed = phase_results.iter().map(|r| r.tests_passed).sum::<u32>();
        let total_failed = phase_results.iter().map(|r| r.tests_failed).sum::<u32>();

        let functional_score = if total_tests == 0 {
            self.policy.skipped_functional_score
        } else {
            100.0 * total_passed as f64 / total_tests as f64
        };

        let security_score = phase_results
            .iter()
            .filter(|r| r.phase == PhaseKind::Security)
            .find_map(|r| r.security_score())
            .unwrap_or(self.policy.skipped_security_score);

        let metrics = phase_results
            .iter()
            .flat_map(|r| r.performance_metrics())
            .collect::<Vec<_>>();
        let overview = PerformanceOverview::from_metrics(&metrics);
        let performance_score = overview
            .map(|o| o.score())
            .unwrap_or(self.policy.skipped_performance_score);

        let overall_score = (self.policy.functional_weight * functional_score
            + self.policy.security_weight * security_score
            + self.policy.performance_weight * performance_score)
            / self.policy.weights_total();

        let mut severity_counts = SeverityCounts::default();
        for result in phase_results {
            severity_counts.merge(&result.severity_counts);
        }

        let overall_status = if severity_counts.critical > 0 {
            AuditStatus::Fail
        } else if severity_counts.high > self.policy.max_high_severity
            || overall_score < self.policy.warning_below_score
        {
            AuditStatus::Warning
        } else {
            AuditStatus::Pass
        };

        log::debug!(
            "Scored {} phases: functional {functional_score:.1}, security {security_score:.1}, performance {performance_score:.1}, overall {overall_score:.1} ({overall_status})",
            phase_results.len()
        );

        AuditSummary {
            overall_status,
            overall_score,
            functional_score,
            security_score,
            performance_score,
            performance_grade: overview.map(|o| o.grade()),
            execution_time_minutes: context.execution_time.as_secs_f64() / 60.0,
            total_tests,
            total_passed,
            total_failed,
            severity_counts,
            recommendations: recommend(
                phase_results,
                security_score,
                overview.as_ref(),
                alerts_raised,
            ),
            next_audit_date: context.completed_at + next_audit_interval(overall_status),
            monitoring,
            alerts_raised,
        }
    }
}

fn next_audit_interval(status: AuditStatus) -> chrono::Duration {
    match status {
        AuditStatus::Pass => chrono::Duration::days(30),
        AuditStatus::Warning => chrono::Duration::days(14),
        AuditStatus::Fail => chrono::Duration::days(7),
    }
}
