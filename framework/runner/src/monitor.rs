use anyhow::Context;
use load_audit_core::prelude::{Clock, ConfigError, DelegatedShutdownListener, ShutdownHandle, TokioClock};
use load_audit_instruments::LiveLoadStats;
use load_audit_summary_model::{AlertEvent, AlertKind, MonitorSummary, RealTimeSample};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Values above which a sample raises an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertThresholds {
    pub response_time_ms: f64,
    pub error_rate_pct: f64,
    pub memory_usage_mb: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            response_time_ms: 3000.0,
            error_rate_pct: 5.0,
            memory_usage_mb: 512.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Time between samples
    pub interval_ms: u64,
    /// How far back the sample window reaches
    pub retention_ms: u64,
    pub thresholds: AlertThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            retention_ms: 5 * 60 * 1000,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// The number of samples the window retains.
    pub fn capacity(&self) -> usize {
        (self.retention_ms / self.interval_ms.max(1)).max(1) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidMonitor {
                reason: "sample interval must be greater than zero".to_string(),
            });
        }

        for (name, value) in [
            ("response time", self.thresholds.response_time_ms),
            ("error rate", self.thresholds.error_rate_pct),
            ("memory usage", self.thresholds.memory_usage_mb),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidMonitor {
                    reason: format!("{name} threshold must be a non-negative number, got {value}"),
                });
            }
        }

        Ok(())
    }
}

/// One raw reading, stamped by the monitor when it becomes a [RealTimeSample].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleReading {
    pub response_time: f64,
    pub active_users: u64,
    pub memory_usage_mb: f64,
    pub error_rate_pct: f64,
    pub throughput: f64,
}

/// Where the monitor gets its readings from.
pub trait SampleSource: Send + 'static {
    fn sample(&mut self) -> anyhow::Result<SampleReading>;

    /// Called each time the monitor starts, before the first tick.
    fn reset(&mut self) {}
}

/// Receives threshold alerts. Delivery is fire-and-forget.
pub trait AlertSink: Send + Sync + 'static {
    fn alert(&self, event: AlertEvent);
}

/// Reads the live load test counters and the memory use of this process.
pub struct LiveSampleSource {
    live: Arc<LiveLoadStats>,
    system: System,
    pid: Option<Pid>,
    last_reading: Instant,
}

impl LiveSampleSource {
    pub fn new(live: Arc<LiveLoadStats>) -> Self {
        let pid = sysinfo::get_current_pid()
            .inspect_err(|e| log::warn!("Memory usage will not be sampled: {e}"))
            .ok();

        Self {
            live,
            system: System::new(),
            pid,
            last_reading: Instant::now(),
        }
    }

    fn memory_usage_mb(&mut self) -> anyhow::Result<f64> {
        let Some(pid) = self.pid else {
            return Ok(0.0);
        };

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        let process = self
            .system
            .process(pid)
            .context("Failed to get process info")?;

        Ok(process.memory() as f64 / (1024.0 * 1024.0))
    }
}

impl SampleSource for LiveSampleSource {
    fn sample(&mut self) -> anyhow::Result<SampleReading> {
        let elapsed = self.last_reading.elapsed();
        self.last_reading = Instant::now();

        let reading = self.live.take_reading(elapsed.as_secs_f64());
        Ok(SampleReading {
            response_time: reading.response_time,
            active_users: reading.active_users,
            memory_usage_mb: self.memory_usage_mb()?,
            error_rate_pct: reading.error_rate_pct,
            throughput: reading.throughput,
        })
    }

    /// Rates are measured from monitor start, so anything counted before it is dropped.
    fn reset(&mut self) {
        self.live.take_reading(0.0);
        self.last_reading = Instant::now();
    }
}

/// Writes alerts to the log.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self, event: AlertEvent) {
        log::warn!("{}", event.message);
    }
}

/// Forwards alerts to a channel.
#[derive(Debug)]
pub struct ChannelAlertSink {
    sender: UnboundedSender<AlertEvent>,
}

impl ChannelAlertSink {
    pub fn new(sender: UnboundedSender<AlertEvent>) -> Self {
        Self { sender }
    }
}

impl AlertSink for ChannelAlertSink {
    fn alert(&self, event: AlertEvent) {
        if let Err(e) = self.sender.send(event) {
            log::debug!("Alert receiver has gone away: {e:?}");
        }
    }
}

/// Logs alerts and keeps them so they can be counted once monitoring ends.
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().clone()
    }
}

impl AlertSink for CollectingAlertSink {
    fn alert(&self, event: AlertEvent) {
        log::warn!("{}", event.message);
        self.events.lock().push(event);
    }
}

struct MonitorShared {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    source: Mutex<Box<dyn SampleSource>>,
    sink: Arc<dyn AlertSink>,
    window: Mutex<VecDeque<RealTimeSample>>,
}

impl MonitorShared {
    fn tick(&self) {
        let reading = match self.source.lock().sample() {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("Skipping monitor sample: {e:?}");
                return;
            }
        };

        let sample = RealTimeSample {
            timestamp: self.clock.now(),
            response_time: reading.response_time,
            active_users: reading.active_users,
            memory_usage_mb: reading.memory_usage_mb,
            error_rate_pct: reading.error_rate_pct,
            throughput: reading.throughput,
        };

        let thresholds = &self.config.thresholds;
        for (kind, observed, threshold) in [
            (AlertKind::ResponseTime, sample.response_time, thresholds.response_time_ms),
            (AlertKind::ErrorRate, sample.error_rate_pct, thresholds.error_rate_pct),
            (AlertKind::MemoryUsage, sample.memory_usage_mb, thresholds.memory_usage_mb),
        ] {
            if observed > threshold {
                self.sink
                    .alert(AlertEvent::new(sample.timestamp, kind, observed, threshold));
            }
        }

        let mut window = self.window.lock();
        window.push_back(sample);
        while window.len() > self.config.capacity() {
            window.pop_front();
        }
    }
}

enum MonitorState {
    Idle,
    Running {
        shutdown: ShutdownHandle,
        task: JoinHandle<()>,
    },
}

/// Periodic sampler with a bounded window of recent samples and threshold alerts.
///
/// Runs independently of the load test it observes. The window survives `stop()` so the
/// summary can be read afterwards.
pub struct RealTimeMonitor {
    shared: Arc<MonitorShared>,
    state: Mutex<MonitorState>,
}

impl RealTimeMonitor {
    pub fn new(
        config: MonitorConfig,
        source: impl SampleSource,
        sink: Arc<dyn AlertSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(MonitorShared {
                config,
                clock: Arc::new(TokioClock::new()),
                source: Mutex::new(Box::new(source)),
                sink,
                window: Mutex::new(VecDeque::with_capacity(config.capacity())),
            }),
            state: Mutex::new(MonitorState::Idle),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Start sampling. Must be called from within a tokio runtime.
    ///
    /// Does nothing if the monitor is already running. Samples retained from an earlier run
    /// are kept.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if matches!(*state, MonitorState::Running { .. }) {
            log::debug!("Real-time monitor is already running");
            return;
        }

        self.shared.source.lock().reset();
        let shutdown = ShutdownHandle::new();
        let task = tokio::spawn(tick_loop(self.shared.clone(), shutdown.new_listener()));
        log::info!(
            "Started real-time monitor, sampling every {:?}",
            self.shared.config.interval()
        );

        *state = MonitorState::Running { shutdown, task };
    }

    /// Stop sampling and wait for the tick task to exit.
    ///
    /// A tick that is already in progress completes. Calling this when not running does
    /// nothing.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), MonitorState::Idle);
        let MonitorState::Running { shutdown, task } = previous else {
            return;
        };

        shutdown.shutdown();
        if let Err(e) = task.await {
            log::error!("Real-time monitor task failed: {e:?}");
        }
        log::info!("Stopped real-time monitor");
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), MonitorState::Running { .. })
    }

    /// A copy of the current window, oldest first.
    pub fn samples(&self) -> Vec<RealTimeSample> {
        self.shared.window.lock().iter().cloned().collect()
    }

    /// Summarise the current window, or `None` when nothing has been sampled.
    pub fn summary(&self) -> Option<MonitorSummary> {
        let window = self.shared.window.lock();
        let oldest = window.front()?;
        let latest = window.back()?;
        let count = window.len() as f64;
        let avg = |f: fn(&RealTimeSample) -> f64| window.iter().map(f).sum::<f64>() / count;

        Some(MonitorSummary {
            latest: latest.clone(),
            sample_count: window.len(),
            avg_response_time: avg(|s| s.response_time),
            avg_active_users: avg(|s| s.active_users as f64),
            avg_memory_usage_mb: avg(|s| s.memory_usage_mb),
            avg_error_rate_pct: avg(|s| s.error_rate_pct),
            avg_throughput: avg(|s| s.throughput),
            span_ms: (latest.timestamp - oldest.timestamp).num_milliseconds(),
        })
    }
}

async fn tick_loop(shared: Arc<MonitorShared>, mut shutdown_listener: DelegatedShutdownListener) {
    let period = shared.config.interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_listener.wait_for_shutdown() => {
                log::trace!("Monitor tick loop shutting down");
                break;
            }
            _ = ticker.tick() => shared.tick(),
        }
    }
}
