use crate::{MonitorSummary, PerformanceMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The stages of an audit, in the order they are run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Functional,
    Security,
    Integration,
    Performance,
    Database,
}

impl Display for PhaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Functional => write!(f, "functional"),
            PhaseKind::Security => write!(f, "security"),
            PhaseKind::Integration => write!(f, "integration"),
            PhaseKind::Performance => write!(f, "performance"),
            PhaseKind::Database => write!(f, "database"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn merge(&mut self, other: &SeverityCounts) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
    }

    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }
}

/// A single failed check reported by a phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseIssue {
    pub severity: Severity,
    pub message: String,
}

/// Phase specific output, beyond the pass/fail tally.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PhaseDetail {
    #[default]
    None,
    Security {
        score: f64,
    },
    Performance {
        metrics: Vec<PerformanceMetrics>,
    },
}

/// One phase's contribution to the overall audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditPhaseResult {
    pub phase: PhaseKind,
    pub phase_name: String,
    pub tests_run: u32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub severity_counts: SeverityCounts,
    #[serde(default)]
    pub issues: Vec<PhaseIssue>,
    #[serde(default)]
    pub detail: PhaseDetail,
}

impl AuditPhaseResult {
    pub fn new(phase: PhaseKind, phase_name: impl Into<String>) -> Self {
        Self {
            phase,
            phase_name: phase_name.into(),
            tests_run: 0,
            tests_passed: 0,
            tests_failed: 0,
            severity_counts: SeverityCounts::default(),
            issues: Vec::new(),
            detail: PhaseDetail::None,
        }
    }

    /// The result for a phase that could not run at all.
    ///
    /// Counts as a single failed test with a critical issue carrying the diagnostic.
    pub fn failed(phase: PhaseKind, phase_name: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        let mut result = Self::new(phase, phase_name);
        result.record_fail(Severity::Critical, diagnostic);
        result
    }

    pub fn record_pass(&mut self) {
        self.tests_run += 1;
        self.tests_passed += 1;
    }

    pub fn record_fail(&mut self, severity: Severity, message: impl Into<String>) {
        self.tests_run += 1;
        self.tests_failed += 1;
        self.severity_counts.add(severity);
        self.issues.push(PhaseIssue {
            severity,
            message: message.into(),
        });
    }

    pub fn with_detail(mut self, detail: PhaseDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn security_score(&self) -> Option<f64> {
        match &self.detail {
            PhaseDetail::Security { score } => Some(*score),
            _ => None,
        }
    }

    pub fn performance_metrics(&self) -> &[PerformanceMetrics] {
        match &self.detail {
            PhaseDetail::Performance { metrics } => metrics,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pass,
    Warning,
    Fail,
}

impl Display for AuditStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStatus::Pass => write!(f, "pass"),
            AuditStatus::Warning => write!(f, "warning"),
            AuditStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Letter grade for load test performance, best first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C")]
    C,
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::APlus => write!(f, "A+"),
            Grade::A => write!(f, "A"),
            Grade::BPlus => write!(f, "B+"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
        }
    }
}

/// The outcome of a full audit run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditSummary {
    pub overall_status: AuditStatus,
    /// Weighted score between 0 and 100
    pub overall_score: f64,
    pub functional_score: f64,
    pub security_score: f64,
    pub performance_score: f64,
    /// Only set when the audit produced performance metrics
    pub performance_grade: Option<Grade>,
    pub execution_time_minutes: f64,
    pub total_tests: u32,
    pub total_passed: u32,
    pub total_failed: u32,
    pub severity_counts: SeverityCounts,
    pub recommendations: Vec<String>,
    pub next_audit_date: DateTime<Utc>,
    #[serde(default)]
    pub monitoring: Option<MonitorSummary>,
    #[serde(default)]
    pub alerts_raised: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_phase_counts_one_critical_failure() {
        let result = AuditPhaseResult::failed(PhaseKind::Database, "Database", "connection refused");

        assert_eq!(1, result.tests_run);
        assert_eq!(1, result.tests_failed);
        assert_eq!(0, result.tests_passed);
        assert_eq!(1, result.severity_counts.critical);
        assert_eq!("connection refused", result.issues[0].message);
    }

    #[test]
    fn tally_stays_consistent() {
        let mut result = AuditPhaseResult::new(PhaseKind::Functional, "Frontend");
        result.record_pass();
        result.record_pass();
        result.record_fail(Severity::High, "checkout button missing");
        result.record_fail(Severity::Low, "slow font load");

        assert_eq!(4, result.tests_run);
        assert_eq!(result.tests_run, result.tests_passed + result.tests_failed);
        assert_eq!(2, result.severity_counts.total());
    }

    #[test]
    fn grade_serializes_as_letter() {
        assert_eq!("\"A+\"", serde_json::to_string(&Grade::APlus).unwrap());
        assert_eq!(Grade::BPlus, serde_json::from_str("\"B+\"").unwrap());
        assert!(Grade::APlus < Grade::C);
    }
}
