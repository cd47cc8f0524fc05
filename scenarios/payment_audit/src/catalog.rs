use load_audit_runner::prelude::{ChecklistItem, ChecklistPhase, PhaseKind, Severity};

/// A checklist entry with its most recent recorded result.
type Check = (&'static str, Severity, bool);

const FRONTEND: &[Check] = &[
    ("Checkout form validates card number format", Severity::High, true),
    ("Expiry date rejects past months", Severity::Medium, true),
    ("Pay button disabled while a payment is in flight", Severity::High, true),
    ("Payment method selector is keyboard accessible", Severity::Low, false),
    ("Error messages do not echo card data", Severity::Critical, true),
    ("Receipt page shows the transaction reference", Severity::Medium, true),
];

const SECURITY: &[Check] = &[
    ("TLS 1.2 or later enforced on payment endpoints", Severity::Critical, true),
    ("Card numbers masked in application logs", Severity::Critical, true),
    ("Rate limiting on authorisation attempts", Severity::High, true),
    ("Webhook signatures verified", Severity::High, true),
    ("Content Security Policy header set", Severity::Medium, true),
    ("Server version header suppressed", Severity::Low, false),
];

const INTEGRATION: &[Check] = &[
    ("Card gateway sandbox authorises a test payment", Severity::Critical, true),
    ("PIX QR code generation", Severity::High, true),
    ("Bank transfer settlement callback handled", Severity::High, true),
    ("Digital wallet token exchange", Severity::High, true),
    ("Boleto issuance and expiry", Severity::Medium, true),
    ("Idempotency key prevents double charges", Severity::Critical, true),
];

const DATABASE: &[Check] = &[
    ("Transactions table has foreign keys to customers", Severity::High, true),
    ("Ledger writes are atomic with payment status updates", Severity::Critical, true),
    ("Indexes cover the settlement report queries", Severity::Medium, true),
    ("Backups encrypted at rest", Severity::High, true),
    ("Stale pending payments are swept", Severity::Low, true),
];

fn checklist(kind: PhaseKind, name: &str, checks: &[Check]) -> ChecklistPhase {
    ChecklistPhase::new(
        kind,
        name,
        checks
            .iter()
            .map(|(check, severity, passed)| ChecklistItem::recorded(*check, *severity, *passed))
            .collect(),
    )
}

/// The qualitative phases of a payment system audit.
pub fn phases() -> Vec<ChecklistPhase> {
    vec![
        checklist(PhaseKind::Functional, "Checkout Frontend", FRONTEND),
        checklist(PhaseKind::Security, "Payment Security", SECURITY),
        checklist(PhaseKind::Integration, "Gateway Integration", INTEGRATION),
        checklist(PhaseKind::Database, "Payments Database", DATABASE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use load_audit_runner::prelude::AuditPhase;

    #[test]
    fn security_catalog_scores_its_failures() {
        let security = phases()
            .into_iter()
            .find(|phase| phase.kind() == PhaseKind::Security)
            .unwrap();

        let result = security.evaluate();
        assert_eq!(Some(97.0), result.security_score());
        assert_eq!(1, result.tests_failed);
    }
}
