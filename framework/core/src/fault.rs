/// An invalid configuration, rejected before any work is scheduled.
///
/// Configuration faults are only fatal to the run they describe. They are never clamped into a
/// valid value.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[display("Load test has no name")]
    MissingName,
    #[display("Load test [{name}] has no traffic classes")]
    NoTrafficClasses { name: String },
    #[display("Load test [{name}] has a blank traffic class")]
    BlankTrafficClass { name: String },
    #[display("Load test [{name}] lists traffic class [{traffic_class}] more than once")]
    DuplicateTrafficClass { name: String, traffic_class: String },
    #[display("Load test [{name}] has a non-finite request rate: {rate}")]
    InvalidRate { name: String, rate: f64 },
    #[display("Load test [{name}] would make {requests} requests per user, the limit is {limit}")]
    TooManyRequests {
        name: String,
        requests: u64,
        limit: u64,
    },
    #[display("Outcome parameters for [{traffic_class}] are invalid: {reason}")]
    InvalidOutcomeParams {
        traffic_class: String,
        reason: String,
    },
    #[display("Monitor configuration is invalid: {reason}")]
    InvalidMonitor { reason: String },
}
