use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One tick of the real-time monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealTimeSample {
    pub timestamp: DateTime<Utc>,
    /// Mean response time since the previous tick, in milliseconds
    pub response_time: f64,
    pub active_users: u64,
    pub memory_usage_mb: f64,
    pub error_rate_pct: f64,
    /// Successful requests per second since the previous tick
    pub throughput: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ResponseTime,
    ErrorRate,
    MemoryUsage,
}

impl Display for AlertKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::ResponseTime => write!(f, "response time"),
            AlertKind::ErrorRate => write!(f, "error rate"),
            AlertKind::MemoryUsage => write!(f, "memory usage"),
        }
    }
}

/// Raised when a monitoring sample crosses a threshold. Not retained by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub observed: f64,
    pub threshold: f64,
    pub message: String,
}

impl AlertEvent {
    pub fn new(timestamp: DateTime<Utc>, kind: AlertKind, observed: f64, threshold: f64) -> Self {
        let message = match kind {
            AlertKind::ResponseTime => {
                format!("High response time: {observed:.0}ms (threshold {threshold:.0}ms)")
            }
            AlertKind::ErrorRate => {
                format!("High error rate: {observed:.2}% (threshold {threshold:.2}%)")
            }
            AlertKind::MemoryUsage => {
                format!("High memory usage: {observed:.1}MB (threshold {threshold:.1}MB)")
            }
        };

        Self {
            timestamp,
            kind,
            observed,
            threshold,
            message,
        }
    }
}

/// Summary of the samples currently retained by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSummary {
    pub latest: RealTimeSample,
    pub sample_count: usize,
    pub avg_response_time: f64,
    pub avg_active_users: f64,
    pub avg_memory_usage_mb: f64,
    pub avg_error_rate_pct: f64,
    pub avg_throughput: f64,
    /// Time between the oldest and newest retained sample
    pub span_ms: i64,
}
