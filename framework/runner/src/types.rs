use std::any::Any;

/// Recommended error type for your audit `main` function and any shared code that feeds the
/// orchestrator. This type is compatible with [PhaseResult] so you can use `?` to propagate
/// errors.
pub type AuditResult<T> = anyhow::Result<T>;

/// Returned by an [crate::phase::AuditPhase] when it runs.
pub type PhaseResult = anyhow::Result<load_audit_summary_model::AuditPhaseResult>;

/// Best effort text for a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}
