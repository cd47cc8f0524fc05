use crate::types::PhaseResult;
use futures::future::BoxFuture;
use futures::FutureExt;
use load_audit_summary_model::{AuditPhaseResult, PhaseDetail, PhaseKind, Severity, SeverityCounts};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A collaborator that runs one qualitative phase of an audit.
///
/// Returning an error, or panicking, is not fatal to the audit. The orchestrator records the
/// phase as failed with a critical issue and moves on to the next phase.
pub trait AuditPhase: Send + Sync {
    fn kind(&self) -> PhaseKind;

    fn name(&self) -> &str;

    fn run(&self) -> BoxFuture<'_, PhaseResult>;
}

pub type CheckFn = Arc<dyn Fn() -> anyhow::Result<bool> + Send + Sync>;

/// One entry of a static checklist.
#[derive(Clone)]
pub struct ChecklistItem {
    pub name: String,
    /// The severity recorded when the check fails
    pub severity: Severity,
    pub check: CheckFn,
}

impl ChecklistItem {
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        check: impl Fn() -> anyhow::Result<bool> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            check: Arc::new(check),
        }
    }

    /// An item whose outcome is already known, for catalogs of recorded results.
    pub fn recorded(name: impl Into<String>, severity: Severity, passed: bool) -> Self {
        Self::new(name, severity, move || Ok(passed))
    }
}

impl Debug for ChecklistItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecklistItem")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

/// Points deducted from the security score for each failed check.
pub fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 25.0,
        Severity::High => 15.0,
        Severity::Medium => 8.0,
        Severity::Low => 3.0,
    }
}

/// `100` less the penalty for every counted issue, never below zero.
pub fn security_score(counts: &SeverityCounts) -> f64 {
    let penalty = counts.critical as f64 * severity_penalty(Severity::Critical)
        + counts.high as f64 * severity_penalty(Severity::High)
        + counts.medium as f64 * severity_penalty(Severity::Medium)
        + counts.low as f64 * severity_penalty(Severity::Low);

    (100.0 - penalty).max(0.0)
}

/// A phase made of a fixed list of pass/fail checks.
///
/// A check that returns an error counts as failed, with the error in the issue message. When
/// the phase kind is [PhaseKind::Security] the result also carries a security score.
#[derive(Debug, Clone)]
pub struct ChecklistPhase {
    kind: PhaseKind,
    name: String,
    items: Vec<ChecklistItem>,
}

impl ChecklistPhase {
    pub fn new(kind: PhaseKind, name: impl Into<String>, items: Vec<ChecklistItem>) -> Self {
        Self {
            kind,
            name: name.into(),
            items,
        }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn evaluate(&self) -> AuditPhaseResult {
        let mut result = AuditPhaseResult::new(self.kind, self.name.clone());

        for item in &self.items {
            match (item.check)() {
                Ok(true) => result.record_pass(),
                Ok(false) => {
                    log::debug!("Check [{}] failed in {} phase", item.name, self.name);
                    result.record_fail(item.severity, item.name.clone());
                }
                Err(e) => {
                    log::warn!("Check [{}] errored in {} phase: {e:?}", item.name, self.name);
                    result.record_fail(item.severity, format!("{}: {e}", item.name));
                }
            }
        }

        if self.kind == PhaseKind::Security {
            let score = security_score(&result.severity_counts);
            result = result.with_detail(PhaseDetail::Security { score });
        }

        result
    }
}

impl AuditPhase for ChecklistPhase {
    fn kind(&self) -> PhaseKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> BoxFuture<'_, PhaseResult> {
        async move { Ok(self.evaluate()) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn penalties_reduce_security_score() {
        let mut counts = SeverityCounts::default();
        assert_eq!(100.0, security_score(&counts));

        counts.add(Severity::High);
        counts.add(Severity::Medium);
        counts.add(Severity::Low);
        assert_eq!(74.0, security_score(&counts));

        for _ in 0..4 {
            counts.add(Severity::Critical);
        }
        assert_eq!(0.0, security_score(&counts));
    }

    #[tokio::test]
    async fn security_checklist_reports_score() {
        let phase = ChecklistPhase::new(
            PhaseKind::Security,
            "Security",
            vec![
                ChecklistItem::recorded("TLS enforced on payment endpoints", Severity::Critical, true),
                ChecklistItem::recorded("Rate limiting on login", Severity::High, false),
                ChecklistItem::new("Card numbers masked in logs", Severity::Medium, || {
                    anyhow::bail!("log sample unavailable")
                }),
            ],
        );

        let result = phase.run().await.unwrap();

        assert_eq!(3, result.tests_run);
        assert_eq!(1, result.tests_passed);
        assert_eq!(2, result.tests_failed);
        assert_eq!(1, result.severity_counts.high);
        assert_eq!(1, result.severity_counts.medium);
        assert_eq!(Some(77.0), result.security_score());
        assert_eq!(
            "Card numbers masked in logs: log sample unavailable",
            result.issues[1].message
        );
    }

    #[tokio::test]
    async fn other_checklists_have_no_score() {
        let phase = ChecklistPhase::new(
            PhaseKind::Database,
            "Database",
            vec![ChecklistItem::recorded("Foreign keys enforced", Severity::High, true)],
        );

        let result = phase.run().await.unwrap();
        assert_eq!(None, result.security_score());
        assert_eq!(PhaseDetail::None, result.detail);
    }
}
