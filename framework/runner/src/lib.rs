mod cli;
mod config;
mod init;
mod monitor;
mod orchestrator;
mod outcome;
mod phase;
mod progress;
mod scheduler;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::AuditCli;
    pub use crate::config::{AuditConfig, AuditStage, PhaseToggles, SimulationConfig};
    pub use crate::init::init;
    pub use crate::monitor::{
        AlertSink, AlertThresholds, ChannelAlertSink, CollectingAlertSink, LiveSampleSource,
        LogAlertSink, MonitorConfig, RealTimeMonitor, SampleReading, SampleSource,
    };
    pub use crate::orchestrator::{AuditOrchestrator, PASSING_GRADE};
    pub use crate::outcome::{
        simulate, AttemptResult, OutcomeParams, RequestDriver, SimulatedDriver,
        SimulatedOutcomeModel,
    };
    pub use crate::phase::{
        security_score, severity_penalty, AuditPhase, CheckFn, ChecklistItem, ChecklistPhase,
    };
    pub use crate::scheduler::{
        ramp_up_plan, LoadTestScheduler, ScheduledRun, DEFAULT_ATTEMPT_TIMEOUT, RAMP_UP_INTERVALS,
    };
    pub use crate::shutdown::start_shutdown_listener;
    pub use crate::types::{AuditResult, PhaseResult};

    // Re-export the model and the shared runtime pieces so audit binaries only need this crate.
    pub use load_audit_core::prelude::{ConfigError, ShutdownHandle};
    pub use load_audit_instruments::{
        render_metrics_table, render_phase_table, render_traffic_class_table,
    };
    pub use load_audit_summariser::{ScoreCalculator, ScorePolicy};
    pub use load_audit_summary_model::*;
}
