use load_audit_summary_model::RequestOutcome;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for a load test in progress.
///
/// The scheduler feeds this as virtual users start and attempts complete. The real-time
/// monitor takes a [LiveReading] on each tick, which resets the per-tick counters.
#[derive(Debug, Default)]
pub struct LiveLoadStats {
    active_users: AtomicU64,
    since_last_reading: Mutex<TickCounters>,
}

#[derive(Debug, Default)]
struct TickCounters {
    successes: u64,
    failures: u64,
    success_latency_sum_ms: f64,
}

/// What happened since the previous reading.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveReading {
    pub active_users: u64,
    pub response_time: f64,
    pub error_rate_pct: f64,
    pub throughput: f64,
}

impl LiveLoadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_started(&self) {
        self.active_users.fetch_add(1, Ordering::Relaxed);
    }

    pub fn user_finished(&self) {
        // Saturate rather than wrap if a finish is reported without a start.
        let _ = self
            .active_users
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn active_users(&self) -> u64 {
        self.active_users.load(Ordering::Relaxed)
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        let mut counters = self.since_last_reading.lock();
        if outcome.success {
            counters.successes += 1;
            counters.success_latency_sum_ms += outcome.latency_ms;
        } else {
            counters.failures += 1;
        }
    }

    /// Take a reading covering `elapsed_s` seconds and start a new tick.
    pub fn take_reading(&self, elapsed_s: f64) -> LiveReading {
        let counters = std::mem::take(&mut *self.since_last_reading.lock());
        let total = counters.successes + counters.failures;

        LiveReading {
            active_users: self.active_users(),
            response_time: if counters.successes > 0 {
                counters.success_latency_sum_ms / counters.successes as f64
            } else {
                0.0
            },
            error_rate_pct: if total > 0 {
                counters.failures as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            throughput: if elapsed_s > 0.0 {
                counters.successes as f64 / elapsed_s
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn reading_covers_one_tick() {
        let stats = LiveLoadStats::new();
        stats.user_started();
        stats.user_started();
        stats.record(&RequestOutcome::new("card", true, 100.0, Utc::now()));
        stats.record(&RequestOutcome::new("card", true, 300.0, Utc::now()));
        stats.record(&RequestOutcome::new("card", false, 50.0, Utc::now()));
        stats.record(&RequestOutcome::new("card", true, 200.0, Utc::now()));

        let reading = stats.take_reading(2.0);
        assert_eq!(
            LiveReading {
                active_users: 2,
                response_time: 200.0,
                error_rate_pct: 25.0,
                throughput: 1.5,
            },
            reading
        );

        stats.user_finished();
        let idle = stats.take_reading(2.0);
        assert_eq!(1, idle.active_users);
        assert_eq!(0.0, idle.response_time);
        assert_eq!(0.0, idle.throughput);
    }

    #[test]
    fn finishing_more_users_than_started_saturates() {
        let stats = LiveLoadStats::new();
        stats.user_finished();
        assert_eq!(0, stats.active_users());
    }
}
