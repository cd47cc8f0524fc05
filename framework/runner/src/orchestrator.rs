use crate::config::{AuditStage, PhaseToggles};
use crate::monitor::{CollectingAlertSink, LiveSampleSource, MonitorConfig, RealTimeMonitor};
use crate::outcome::RequestDriver;
use crate::phase::AuditPhase;
use crate::progress::start_progress;
use crate::scheduler::{LoadTestScheduler, DEFAULT_ATTEMPT_TIMEOUT};
use crate::types::{panic_message, PhaseResult};
use futures::FutureExt;
use load_audit_core::prelude::{Clock, ConfigError, ShutdownHandle, TokioClock};
use load_audit_instruments::LiveLoadStats;
use load_audit_summariser::{grade, ScoreCalculator, ScoreContext};
use load_audit_summary_model::{
    AuditPhaseResult, AuditReport, Grade, LoadTestConfig, PerformanceMetrics, PhaseDetail,
    PhaseKind, Severity,
};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The worst grade a load test scenario may get and still pass.
pub const PASSING_GRADE: Grade = Grade::BPlus;

const LOAD_TEST_PHASE_NAME: &str = "Load Testing";

struct MonitorSetup {
    monitor: RealTimeMonitor,
    window: Duration,
    alerts: Arc<CollectingAlertSink>,
}

/// Runs the stages of an audit in a fixed order and scores the outcome.
///
/// The order is functional, security, integration, load test, database and finally the
/// real-time monitoring window. A stage that is switched off is skipped regardless of what
/// happened before it. A failing collaborator never aborts the audit.
pub struct AuditOrchestrator {
    driver: Arc<dyn RequestDriver>,
    phases: Vec<Box<dyn AuditPhase>>,
    load_tests: Vec<LoadTestConfig>,
    toggles: PhaseToggles,
    calculator: ScoreCalculator,
    clock: Arc<dyn Clock>,
    live: Arc<LiveLoadStats>,
    monitor: Option<MonitorSetup>,
    attempt_timeout: Duration,
    seed: Option<u64>,
    shutdown: Option<ShutdownHandle>,
    show_progress: bool,
}

impl AuditOrchestrator {
    pub fn new(driver: Arc<dyn RequestDriver>) -> Self {
        Self {
            driver,
            phases: Vec::new(),
            load_tests: Vec::new(),
            toggles: PhaseToggles::default(),
            calculator: ScoreCalculator::default(),
            clock: Arc::new(TokioClock::new()),
            live: Arc::new(LiveLoadStats::new()),
            monitor: None,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            seed: None,
            shutdown: None,
            show_progress: false,
        }
    }

    /// Add a collaborator. It runs in the stage matching its [AuditPhase::kind], after any
    /// collaborator of the same kind added before it.
    pub fn with_phase(mut self, phase: impl AuditPhase + 'static) -> Self {
        self.phases.push(Box::new(phase));
        self
    }

    pub fn with_load_tests(mut self, load_tests: Vec<LoadTestConfig>) -> Self {
        self.load_tests = load_tests;
        self
    }

    pub fn with_toggles(mut self, toggles: PhaseToggles) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn with_score_calculator(mut self, calculator: ScoreCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Observe the load tests with a [RealTimeMonitor], keeping it running for `window` after
    /// the database stage. Without this the monitoring stage does nothing.
    pub fn with_monitor(mut self, config: MonitorConfig, window: Duration) -> Result<Self, ConfigError> {
        let alerts = Arc::new(CollectingAlertSink::new());
        let monitor = RealTimeMonitor::new(
            config,
            LiveSampleSource::new(self.live.clone()),
            alerts.clone(),
        )?;

        self.monitor = Some(MonitorSetup {
            monitor,
            window,
            alerts,
        });
        Ok(self)
    }

    /// Run the audit to completion.
    pub async fn run(self) -> AuditReport {
        let run_id = nanoid::nanoid!();
        let started = Instant::now();
        let started_at = self.clock.now();
        log::info!("Starting audit {run_id}");

        let mut phase_results = Vec::new();
        for stage in [AuditStage::Functional, AuditStage::Security, AuditStage::Integration] {
            self.run_collaborators(stage, &mut phase_results).await;
        }

        let monitoring = self
            .monitor
            .as_ref()
            .filter(|_| self.toggles.is_enabled(AuditStage::Monitoring));
        if let Some(setup) = monitoring {
            setup.monitor.start();
        }

        let mut performance = Vec::new();
        if self.toggles.is_enabled(AuditStage::LoadTest) {
            let result = capture_phase(
                PhaseKind::Performance,
                LOAD_TEST_PHASE_NAME.to_string(),
                async { Ok(self.run_load_tests().await) },
            )
            .await;
            performance.extend_from_slice(result.performance_metrics());
            phase_results.push(result);
        } else {
            log::info!("Skipping {} stage", AuditStage::LoadTest);
        }
        self.run_collaborators(AuditStage::LoadTest, &mut phase_results).await;

        self.run_collaborators(AuditStage::Database, &mut phase_results).await;

        let (monitor_summary, alerts_raised) = match monitoring {
            Some(setup) => {
                log::info!("Monitoring for a further {:?}", setup.window);
                self.sleep_unless_shutdown(setup.window).await;
                setup.monitor.stop().await;
                (setup.monitor.summary(), setup.alerts.count())
            }
            None => {
                log::info!("Skipping {} stage", AuditStage::Monitoring);
                (None, 0)
            }
        };

        let context = ScoreContext {
            completed_at: self.clock.now(),
            execution_time: started.elapsed(),
        };
        let summary = self.calculator.score_monitored(
            &phase_results,
            context,
            monitor_summary,
            alerts_raised,
        );

        log::info!(
            "Audit {run_id} finished with status {} and score {:.1}",
            summary.overall_status,
            summary.overall_score
        );

        AuditReport {
            run_id,
            started_at,
            summary,
            phases: phase_results,
            performance,
        }
    }

    async fn run_collaborators(&self, stage: AuditStage, results: &mut Vec<AuditPhaseResult>) {
        let phases = self
            .phases
            .iter()
            .filter(|phase| AuditStage::for_phase(phase.kind()) == stage)
            .collect::<Vec<_>>();

        if !self.toggles.is_enabled(stage) {
            if !phases.is_empty() {
                log::info!("Skipping {stage} stage");
            }
            return;
        }

        for phase in phases {
            results.push(run_phase(phase.as_ref()).await);
        }
    }

    async fn run_load_tests(&self) -> AuditPhaseResult {
        let mut scheduler = LoadTestScheduler::new(self.driver.clone())
            .with_clock(self.clock.clone())
            .with_attempt_timeout(self.attempt_timeout)
            .with_live_stats(self.live.clone());
        if let Some(seed) = self.seed {
            scheduler = scheduler.with_seed(seed);
        }
        if let Some(shutdown) = &self.shutdown {
            scheduler = scheduler.with_shutdown(shutdown.clone());
        }

        let mut result = AuditPhaseResult::new(PhaseKind::Performance, LOAD_TEST_PHASE_NAME);
        let mut metrics = Vec::with_capacity(self.load_tests.len());

        for config in &self.load_tests {
            if self.shutdown.as_ref().is_some_and(|s| s.is_shutdown()) {
                log::warn!("Not starting load test [{}], audit is shutting down", config.name);
                continue;
            }

            let progress = self.show_progress.then(|| self.start_progress(config));
            let run = scheduler.run(config).await;
            if let Some(progress) = progress {
                progress.shutdown();
            }

            match run {
                Ok(run) => {
                    let scenario = run.into_metrics(config);
                    record_scenario(&mut result, &scenario);
                    metrics.push(scenario);
                }
                Err(e) => {
                    log::error!("Load test [{}] was not run: {e}", config.name);
                    result.record_fail(
                        Severity::High,
                        format!("Load test [{}] has an invalid configuration: {e}", config.name),
                    );
                }
            }
        }

        result.with_detail(PhaseDetail::Performance { metrics })
    }

    fn start_progress(&self, config: &LoadTestConfig) -> ShutdownHandle {
        let handle = ShutdownHandle::new();
        if let Err(e) = start_progress(&config.name, config.planned_runtime(), handle.new_listener()) {
            log::warn!("Could not show progress for [{}]: {e:?}", config.name);
        }
        handle
    }

    async fn sleep_unless_shutdown(&self, duration: Duration) {
        match &self.shutdown {
            Some(shutdown) => {
                let mut listener = shutdown.new_listener();
                tokio::select! {
                    _ = listener.wait_for_shutdown() => {}
                    _ = tokio::time::sleep(duration) => {}
                }
            }
            None => tokio::time::sleep(duration).await,
        }
    }
}

fn record_scenario(result: &mut AuditPhaseResult, metrics: &PerformanceMetrics) {
    let scenario_grade = grade(metrics.avg_response_time, metrics.success_rate());
    log::info!(
        "Load test [{}] graded {scenario_grade}: {} requests, {:.0}ms average, {:.2}% errors",
        metrics.test_name,
        metrics.total_requests,
        metrics.avg_response_time,
        metrics.error_rate
    );

    if scenario_grade <= PASSING_GRADE {
        result.record_pass();
    } else {
        result.record_fail(
            Severity::High,
            format!(
                "Load test [{}] graded {scenario_grade}, below {PASSING_GRADE}",
                metrics.test_name
            ),
        );
    }
}

async fn run_phase(phase: &dyn AuditPhase) -> AuditPhaseResult {
    capture_phase(phase.kind(), phase.name().to_string(), phase.run()).await
}

/// Run one phase, turning an error or a panic into a failed result.
async fn capture_phase(
    kind: PhaseKind,
    name: String,
    run: impl Future<Output = PhaseResult>,
) -> AuditPhaseResult {
    log::info!("Running {kind} phase [{name}]");

    let outcome = AssertUnwindSafe(run).catch_unwind().await;

    match outcome {
        Ok(Ok(result)) => {
            log::info!(
                "Phase [{name}] finished: {} of {} tests passed",
                result.tests_passed,
                result.tests_run
            );
            result
        }
        Ok(Err(e)) => {
            log::error!("Phase [{name}] failed: {e:?}");
            AuditPhaseResult::failed(kind, name, format!("Phase failed to run: {e:#}"))
        }
        Err(panic) => {
            let reason = panic_message(&*panic);
            log::error!("Phase [{name}] panicked: {reason}");
            AuditPhaseResult::failed(kind, name, format!("Phase panicked: {reason}"))
        }
    }
}
