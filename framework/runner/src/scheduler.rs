use crate::outcome::RequestDriver;
use crate::types::panic_message;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use load_audit_core::prelude::{Clock, ConfigError, DelegatedShutdownListener, ShutdownHandle, TokioClock};
use load_audit_instruments::{LiveLoadStats, MetricsAggregator, OutcomeLog};
use load_audit_summary_model::{LoadTestConfig, OutcomeFault, PerformanceMetrics, RequestOutcome};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Number of equal steps the ramp-up window is split into.
pub const RAMP_UP_INTERVALS: u32 = 10;

/// Upper bound for a single attempt unless overridden.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Traffic class recorded for an outcome whose task was lost before it reported one.
const UNATTRIBUTED_TRAFFIC_CLASS: &str = "unattributed";

/// How many users to activate at the start of each ramp-up interval.
///
/// Each interval activates `ceil(users / 10)` users until none remain. The last interval picks
/// up any remainder, so the plan always sums to `users`.
pub fn ramp_up_plan(users: u32) -> Vec<u32> {
    let step = users.div_ceil(RAMP_UP_INTERVALS);
    let mut remaining = users;
    let mut plan = Vec::with_capacity(RAMP_UP_INTERVALS as usize);

    for interval in 0..RAMP_UP_INTERVALS {
        let count = if interval == RAMP_UP_INTERVALS - 1 {
            remaining
        } else {
            step.min(remaining)
        };
        remaining -= count;
        plan.push(count);
    }

    plan
}

/// The raw result of one scheduled load test.
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RequestOutcome>,
}

impl ScheduledRun {
    /// Reduce the run to metrics named and fingerprinted after the config that produced it.
    pub fn into_metrics(self, config: &LoadTestConfig) -> PerformanceMetrics {
        MetricsAggregator::reduce(&config.name, self.started_at, self.finished_at, &self.outcomes)
            .with_fingerprint(config.fingerprint())
    }
}

/// Drives virtual users against a [RequestDriver] for the shape described by a
/// [LoadTestConfig].
pub struct LoadTestScheduler {
    driver: Arc<dyn RequestDriver>,
    clock: Arc<dyn Clock>,
    rng: Arc<Mutex<StdRng>>,
    attempt_timeout: Duration,
    shutdown: Option<ShutdownHandle>,
    live: Option<Arc<LiveLoadStats>>,
}

impl LoadTestScheduler {
    pub fn new(driver: Arc<dyn RequestDriver>) -> Self {
        Self {
            driver,
            clock: Arc::new(TokioClock::new()),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            shutdown: None,
            live: None,
        }
    }

    /// Seed the traffic class selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
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

    /// Stop issuing new attempts once this handle is triggered.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Report active users and completed outcomes as they happen.
    pub fn with_live_stats(mut self, live: Arc<LiveLoadStats>) -> Self {
        self.live = Some(live);
        self
    }

    /// Run one load test to completion.
    ///
    /// The config is validated before anything is spawned. The returned future resolves once
    /// `ramp_up + duration` has elapsed and every user and attempt has finished, or earlier
    /// when shutdown is signalled and the in-flight attempts have drained.
    pub async fn run(&self, config: &LoadTestConfig) -> Result<ScheduledRun, ConfigError> {
        config.validate()?;

        let started = Instant::now();
        let started_at = self.clock.now();

        if config.concurrent_users == 0 {
            log::info!("Load test [{}] has no users, nothing to schedule", config.name);
            return Ok(ScheduledRun {
                started_at,
                finished_at: started_at,
                outcomes: Vec::new(),
            });
        }

        let plan = ramp_up_plan(config.concurrent_users);
        let interval = config.ramp_up() / RAMP_UP_INTERVALS;
        let requests_per_user = config.requests_per_user();
        let traffic_classes: Arc<[String]> = config.traffic_classes.clone().into();
        let outcome_log = OutcomeLog::new();

        log::info!(
            "Starting load test [{}] with {} users, {} requests each over {:?} after a {:?} ramp-up",
            config.name,
            config.concurrent_users,
            requests_per_user,
            config.duration(),
            config.ramp_up()
        );

        let mut users = JoinSet::new();
        for (index, count) in plan.into_iter().enumerate() {
            let activation = started + interval * index as u32;
            log::debug!("Ramp-up interval {index} activates {count} users at {:?}", activation - started);

            for _ in 0..count {
                let user = VirtualUser {
                    driver: self.driver.clone(),
                    clock: self.clock.clone(),
                    rng: self.rng.clone(),
                    attempt_timeout: self.attempt_timeout,
                    shutdown: self.shutdown.as_ref().map(|handle| handle.new_listener()),
                    live: self.live.clone(),
                    outcome_log: outcome_log.clone(),
                    traffic_classes: traffic_classes.clone(),
                    requests: requests_per_user,
                    rate: config.requests_per_second_per_user,
                };
                users.spawn(user.run(activation));
            }
        }

        while let Some(joined) = users.join_next().await {
            if let Err(e) = joined {
                log::error!("Virtual user task for [{}] was lost: {e:?}", config.name);
                outcome_log.push(RequestOutcome::faulted(
                    UNATTRIBUTED_TRAFFIC_CLASS,
                    OutcomeFault::Dispatch {
                        reason: format!("virtual user task failed: {e}"),
                    },
                    0.0,
                    self.clock.now(),
                ));
            }
        }

        let deadline = started + config.planned_runtime();
        let mut shutdown_listener = self.shutdown.as_ref().map(|handle| handle.new_listener());
        if !wait_until(deadline, shutdown_listener.as_mut()).await {
            log::info!("Load test [{}] stopped early by shutdown", config.name);
        }

        let outcomes = outcome_log.drain();
        log::info!(
            "Load test [{}] finished with {} outcomes in {:?}",
            config.name,
            outcomes.len(),
            started.elapsed()
        );

        Ok(ScheduledRun {
            started_at,
            finished_at: self.clock.now(),
            outcomes,
        })
    }
}

/// Sleep until `deadline`. Returns false if shutdown arrived first.
async fn wait_until(deadline: Instant, shutdown: Option<&mut DelegatedShutdownListener>) -> bool {
    match shutdown {
        Some(listener) => tokio::select! {
            biased;
            _ = listener.wait_for_shutdown() => false,
            _ = tokio::time::sleep_until(deadline) => true,
        },
        None => {
            tokio::time::sleep_until(deadline).await;
            true
        }
    }
}

struct VirtualUser {
    driver: Arc<dyn RequestDriver>,
    clock: Arc<dyn Clock>,
    rng: Arc<Mutex<StdRng>>,
    attempt_timeout: Duration,
    shutdown: Option<DelegatedShutdownListener>,
    live: Option<Arc<LiveLoadStats>>,
    outcome_log: OutcomeLog,
    traffic_classes: Arc<[String]>,
    requests: u64,
    rate: f64,
}

impl VirtualUser {
    async fn run(mut self, activation: Instant) {
        if !wait_until(activation, self.shutdown.as_mut()).await {
            return;
        }

        if let Some(live) = &self.live {
            live.user_started();
        }

        let mut attempts = JoinSet::new();
        for k in 0..self.requests {
            let fire_at = activation + Duration::from_secs_f64(k as f64 / self.rate);
            if !wait_until(fire_at, self.shutdown.as_mut()).await {
                log::debug!("Virtual user stopping after {k} of {} attempts", self.requests);
                break;
            }

            attempts.spawn(attempt(
                self.driver.clone(),
                self.clock.clone(),
                self.attempt_timeout,
                self.pick_traffic_class(),
                self.outcome_log.clone(),
                self.live.clone(),
            ));
        }

        // In-flight attempts are always drained, even after shutdown.
        while let Some(joined) = attempts.join_next().await {
            if let Err(e) = joined {
                log::error!("Attempt task was lost: {e:?}");
                let outcome = RequestOutcome::faulted(
                    UNATTRIBUTED_TRAFFIC_CLASS,
                    OutcomeFault::Dispatch {
                        reason: format!("attempt task failed: {e}"),
                    },
                    0.0,
                    self.clock.now(),
                );
                record(&self.outcome_log, self.live.as_deref(), outcome);
            }
        }

        if let Some(live) = &self.live {
            live.user_finished();
        }
    }

    fn pick_traffic_class(&self) -> String {
        let index = self.rng.lock().gen_range(0..self.traffic_classes.len());
        self.traffic_classes[index].clone()
    }
}

async fn attempt(
    driver: Arc<dyn RequestDriver>,
    clock: Arc<dyn Clock>,
    attempt_timeout: Duration,
    traffic_class: String,
    outcome_log: OutcomeLog,
    live: Option<Arc<LiveLoadStats>>,
) {
    let timestamp = clock.now();
    let started = Instant::now();

    let execution = AssertUnwindSafe(async { driver.execute(&traffic_class).await }).catch_unwind();
    let result = tokio::time::timeout(attempt_timeout, execution).await;
    let outcome = match result {
        Ok(Ok(result)) => {
            RequestOutcome::new(traffic_class, result.success, result.latency_ms, timestamp)
        }
        Ok(Err(panic)) => {
            let reason = panic_message(&*panic);
            log::warn!("Request driver panicked for [{traffic_class}]: {reason}");
            RequestOutcome::faulted(
                traffic_class,
                OutcomeFault::Dispatch { reason },
                started.elapsed().as_secs_f64() * 1000.0,
                timestamp,
            )
        }
        Err(_) => {
            log::debug!("Attempt for [{traffic_class}] timed out after {attempt_timeout:?}");
            RequestOutcome::faulted(
                traffic_class,
                OutcomeFault::Timeout,
                attempt_timeout.as_secs_f64() * 1000.0,
                timestamp,
            )
        }
    };

    record(&outcome_log, live.as_deref(), outcome);
}

fn record(outcome_log: &OutcomeLog, live: Option<&LiveLoadStats>, outcome: RequestOutcome) {
    if let Some(live) = live {
        live.record(&outcome);
    }
    outcome_log.push(outcome);
}
