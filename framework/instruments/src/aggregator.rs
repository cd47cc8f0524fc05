use chrono::{DateTime, Utc};
use itertools::Itertools;
use load_audit_summary_model::{PerformanceMetrics, RequestOutcome, TrafficClassStats};
use std::collections::BTreeMap;

/// Reduces the outcomes of one load test run to [PerformanceMetrics].
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Reduce a complete outcome set.
    ///
    /// This is a total function: an empty outcome set, an outcome set without successes and a
    /// zero-length run all produce zeroed fields rather than NaN.
    pub fn reduce(
        test_name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        outcomes: &[RequestOutcome],
    ) -> PerformanceMetrics {
        let latencies = sorted_success_latencies(outcomes.iter());
        let total_requests = outcomes.len() as u64;
        let successful_requests = latencies.len() as u64;
        let failed_requests = total_requests - successful_requests;

        let elapsed_s = (end_time - start_time).num_milliseconds() as f64 / 1000.0;
        let throughput = if elapsed_s > 0.0 {
            successful_requests as f64 / elapsed_s
        } else {
            0.0
        };

        log::debug!(
            "Reducing {total_requests} outcomes for [{test_name}] over {elapsed_s:.3}s"
        );

        let min_response_time = latencies.first().copied().unwrap_or(0.0);
        let max_response_time = latencies.last().copied().unwrap_or(0.0);
        // Summation rounding must not push the mean outside the observed range.
        let avg_response_time = mean(&latencies).clamp(min_response_time, max_response_time);

        PerformanceMetrics {
            test_name: test_name.to_string(),
            start_time,
            end_time,
            total_requests,
            successful_requests,
            failed_requests,
            avg_response_time,
            p50_response_time: percentile(&latencies, 0.50),
            p95_response_time: percentile(&latencies, 0.95),
            p99_response_time: percentile(&latencies, 0.99),
            min_response_time,
            max_response_time,
            throughput,
            error_rate: error_rate(failed_requests, total_requests),
            config_fingerprint: None,
            by_traffic_class: by_traffic_class(outcomes),
        }
    }
}

/// The value at index `floor(len * q)` of an ascending slice, clamped to the slice bounds.
///
/// Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let index = ((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

fn sorted_success_latencies<'a>(outcomes: impl Iterator<Item = &'a RequestOutcome>) -> Vec<f64> {
    let mut latencies = outcomes
        .filter(|outcome| outcome.success)
        .map(|outcome| outcome.latency_ms)
        .collect::<Vec<_>>();
    latencies.sort_by(f64::total_cmp);
    latencies
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().sum::<f64>() / values.len() as f64
}

fn error_rate(failed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    failed as f64 / total as f64 * 100.0
}

fn by_traffic_class(outcomes: &[RequestOutcome]) -> BTreeMap<String, TrafficClassStats> {
    outcomes
        .iter()
        .into_group_map_by(|outcome| outcome.traffic_class.clone())
        .into_iter()
        .map(|(traffic_class, outcomes)| {
            let latencies = sorted_success_latencies(outcomes.iter().copied());
            let total_requests = outcomes.len() as u64;
            let successful_requests = latencies.len() as u64;

            (
                traffic_class,
                TrafficClassStats {
                    total_requests,
                    successful_requests,
                    avg_response_time: mean(&latencies),
                    p95_response_time: percentile(&latencies, 0.95),
                    error_rate: error_rate(total_requests - successful_requests, total_requests),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use load_audit_summary_model::OutcomeFault;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    fn outcome(traffic_class: &str, success: bool, latency_ms: f64) -> RequestOutcome {
        RequestOutcome::new(traffic_class, success, latency_ms, at(0))
    }

    #[test]
    fn empty_outcome_set_is_all_zero() {
        let metrics = MetricsAggregator::reduce("empty", at(0), at(1000), &[]);

        assert_eq!(0, metrics.total_requests);
        assert_eq!(0.0, metrics.error_rate);
        assert_eq!(0.0, metrics.throughput);
        assert_eq!(0.0, metrics.avg_response_time);
        assert_eq!(0.0, metrics.p99_response_time);
        assert!(metrics.by_traffic_class.is_empty());
    }

    #[test]
    fn zero_elapsed_time_has_zero_throughput() {
        let outcomes = vec![outcome("card", true, 120.0)];
        let metrics = MetricsAggregator::reduce("instant", at(0), at(0), &outcomes);

        assert_eq!(0.0, metrics.throughput);
        assert_eq!(1, metrics.successful_requests);
    }

    #[test]
    fn only_failures_zero_the_latency_fields() {
        let outcomes = vec![
            outcome("card", false, 900.0),
            RequestOutcome::faulted("card", OutcomeFault::Timeout, 30_000.0, at(5)),
        ];
        let metrics = MetricsAggregator::reduce("failing", at(0), at(2000), &outcomes);

        assert_eq!(2, metrics.failed_requests);
        assert_eq!(100.0, metrics.error_rate);
        assert_eq!(0.0, metrics.max_response_time);
        assert_eq!(0.0, metrics.min_response_time);
        assert_eq!(0.0, metrics.throughput);
    }

    #[test]
    fn percentiles_use_floor_index() {
        // 1..=10, unsorted on input
        let outcomes = [7.0, 3.0, 10.0, 1.0, 5.0, 9.0, 2.0, 8.0, 4.0, 6.0]
            .into_iter()
            .map(|latency| outcome("card", true, latency))
            .collect::<Vec<_>>();
        let metrics = MetricsAggregator::reduce("ten", at(0), at(2000), &outcomes);

        assert_eq!(6.0, metrics.p50_response_time);
        assert_eq!(10.0, metrics.p95_response_time);
        assert_eq!(10.0, metrics.p99_response_time);
        assert_eq!(1.0, metrics.min_response_time);
        assert_eq!(10.0, metrics.max_response_time);
        assert_eq!(5.5, metrics.avg_response_time);
        assert_eq!(5.0, metrics.throughput);
    }

    #[test]
    fn error_rate_and_breakdown() {
        let outcomes = vec![
            outcome("card", true, 100.0),
            outcome("card", true, 300.0),
            outcome("card", false, 50.0),
            outcome("wallet", true, 200.0),
        ];
        let metrics = MetricsAggregator::reduce("mixed", at(0), at(1000), &outcomes);

        assert_eq!(25.0, metrics.error_rate);
        assert_eq!(3.0, metrics.throughput);

        let card = &metrics.by_traffic_class["card"];
        assert_eq!(3, card.total_requests);
        assert_eq!(2, card.successful_requests);
        assert_eq!(200.0, card.avg_response_time);

        let wallet = &metrics.by_traffic_class["wallet"];
        assert_eq!(0.0, wallet.error_rate);
        assert_eq!(200.0, wallet.p95_response_time);
    }

    #[test]
    fn ordering_invariants_hold_for_random_sets() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let len = rng.gen_range(1..300);
            let outcomes = (0..len)
                .map(|_| outcome("card", rng.gen_bool(0.9), rng.gen_range(1.0..5000.0)))
                .collect::<Vec<_>>();
            let metrics = MetricsAggregator::reduce("random", at(0), at(10_000), &outcomes);

            assert_eq!(
                metrics.total_requests,
                metrics.successful_requests + metrics.failed_requests
            );
            assert!(metrics.p50_response_time <= metrics.p95_response_time);
            assert!(metrics.p95_response_time <= metrics.p99_response_time);
            assert!(metrics.p99_response_time <= metrics.max_response_time);
            if metrics.successful_requests > 0 {
                assert!(metrics.min_response_time <= metrics.avg_response_time);
                assert!(metrics.avg_response_time <= metrics.max_response_time);
            }
        }
    }
}
