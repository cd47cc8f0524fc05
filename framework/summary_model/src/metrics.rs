use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate metrics for one completed load test run.
///
/// All latency fields are in milliseconds and only consider successful requests. When there are
/// no successful requests the latency fields are all zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub test_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time: f64,
    pub p50_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    /// Successful requests per second of elapsed run time
    pub throughput: f64,
    /// Failed requests as a percentage of all requests
    pub error_rate: f64,
    /// Fingerprint of the scenario that produced these metrics, see
    /// [crate::LoadTestConfig::fingerprint]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_fingerprint: Option<String>,
    /// Breakdown of the same run by traffic class
    #[serde(default)]
    pub by_traffic_class: BTreeMap<String, TrafficClassStats>,
}

impl PerformanceMetrics {
    /// Successful requests as a percentage of all requests, 100 when nothing was sent.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 100.0;
        }

        self.successful_requests as f64 / self.total_requests as f64 * 100.0
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    pub fn with_fingerprint(mut self, fingerprint: String) -> Self {
        self.config_fingerprint = Some(fingerprint);
        self
    }
}

/// Metrics for a single traffic class within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficClassStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub avg_response_time: f64,
    pub p95_response_time: f64,
    pub error_rate: f64,
}
