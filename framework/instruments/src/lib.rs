mod aggregator;
mod live;
mod outcome_log;
mod report;

pub use aggregator::{percentile, MetricsAggregator};
pub use live::{LiveLoadStats, LiveReading};
pub use outcome_log::OutcomeLog;
pub use report::{render_metrics_table, render_phase_table, render_traffic_class_table};
