use load_audit_summary_model::RequestOutcome;
use parking_lot::Mutex;
use std::sync::Arc;

/// Append-only collection of the outcomes of one load test run.
///
/// Owned by a single scheduler invocation and cloned into each attempt task. Outcomes are kept
/// in completion order, which carries no meaning for aggregation.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLog {
    outcomes: Arc<Mutex<Vec<RequestOutcome>>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: RequestOutcome) {
        self.outcomes.lock().push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything recorded so far, leaving the log empty.
    pub fn drain(&self) -> Vec<RequestOutcome> {
        std::mem::take(&mut *self.outcomes.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn concurrent_appends_are_all_kept() {
        let log = OutcomeLog::new();

        std::thread::scope(|s| {
            for t in 0..8 {
                let log = log.clone();
                s.spawn(move || {
                    for i in 0..250 {
                        log.push(RequestOutcome::new(
                            format!("class-{t}"),
                            i % 2 == 0,
                            i as f64,
                            Utc::now(),
                        ));
                    }
                });
            }
        });

        assert_eq!(2000, log.len());
        assert_eq!(2000, log.drain().len());
        assert!(log.is_empty());
    }
}
