use crate::cli::AuditCli;
use crate::monitor::MonitorConfig;
use crate::orchestrator::AuditOrchestrator;
use crate::outcome::{OutcomeParams, RequestDriver, SimulatedDriver, SimulatedOutcomeModel};
use crate::scheduler::DEFAULT_ATTEMPT_TIMEOUT;
use crate::types::AuditResult;
use anyhow::Context;
use load_audit_summariser::{ScoreCalculator, ScorePolicy};
use load_audit_summary_model::{LoadTestConfig, PhaseKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The stages an audit moves through, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditStage {
    Functional,
    Security,
    Integration,
    LoadTest,
    Database,
    Monitoring,
}

impl AuditStage {
    pub const ALL: [AuditStage; 6] = [
        AuditStage::Functional,
        AuditStage::Security,
        AuditStage::Integration,
        AuditStage::LoadTest,
        AuditStage::Database,
        AuditStage::Monitoring,
    ];

    /// The stage collaborator phases of this kind run in.
    pub fn for_phase(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Functional => AuditStage::Functional,
            PhaseKind::Security => AuditStage::Security,
            PhaseKind::Integration => AuditStage::Integration,
            PhaseKind::Performance => AuditStage::LoadTest,
            PhaseKind::Database => AuditStage::Database,
        }
    }
}

impl Display for AuditStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStage::Functional => write!(f, "functional"),
            AuditStage::Security => write!(f, "security"),
            AuditStage::Integration => write!(f, "integration"),
            AuditStage::LoadTest => write!(f, "load-test"),
            AuditStage::Database => write!(f, "database"),
            AuditStage::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// Which stages run. Every stage is enabled by default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhaseToggles {
    pub functional: bool,
    pub security: bool,
    pub integration: bool,
    pub load_test: bool,
    pub database: bool,
    pub monitoring: bool,
}

impl Default for PhaseToggles {
    fn default() -> Self {
        Self {
            functional: true,
            security: true,
            integration: true,
            load_test: true,
            database: true,
            monitoring: true,
        }
    }
}

impl PhaseToggles {
    pub fn is_enabled(&self, stage: AuditStage) -> bool {
        *self.flag(stage)
    }

    pub fn set(&mut self, stage: AuditStage, enabled: bool) {
        *self.flag_mut(stage) = enabled;
    }

    fn flag(&self, stage: AuditStage) -> &bool {
        match stage {
            AuditStage::Functional => &self.functional,
            AuditStage::Security => &self.security,
            AuditStage::Integration => &self.integration,
            AuditStage::LoadTest => &self.load_test,
            AuditStage::Database => &self.database,
            AuditStage::Monitoring => &self.monitoring,
        }
    }

    fn flag_mut(&mut self, stage: AuditStage) -> &mut bool {
        match stage {
            AuditStage::Functional => &mut self.functional,
            AuditStage::Security => &mut self.security,
            AuditStage::Integration => &mut self.integration,
            AuditStage::LoadTest => &mut self.load_test,
            AuditStage::Database => &mut self.database,
            AuditStage::Monitoring => &mut self.monitoring,
        }
    }
}

/// Outcome parameters for the simulated request driver.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Used for traffic classes without their own entry
    pub default: OutcomeParams,
    pub traffic_classes: BTreeMap<String, OutcomeParams>,
}

/// Everything needed to run an audit, loaded from a TOML file and overridden from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub load_tests: Vec<LoadTestConfig>,
    pub phases: PhaseToggles,
    pub monitor: MonitorConfig,
    /// How long to keep monitoring after the database phase
    pub monitor_window_ms: u64,
    pub score: ScorePolicy,
    pub simulation: SimulationConfig,
    pub attempt_timeout_ms: u64,
    pub seed: Option<u64>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            load_tests: Vec::new(),
            phases: PhaseToggles::default(),
            monitor: MonitorConfig::default(),
            monitor_window_ms: 30_000,
            score: ScorePolicy::default(),
            simulation: SimulationConfig::default(),
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
            seed: None,
        }
    }
}

impl AuditConfig {
    pub fn load_from_file(path: &Path) -> AuditResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read audit config: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse audit config: {}", path.display()))?;
        Ok(config)
    }

    /// Apply the command line overrides on top of the file values.
    pub fn apply_cli(&mut self, cli: &AuditCli) -> AuditResult<()> {
        if !cli.scenario.is_empty() {
            for wanted in &cli.scenario {
                if !self
                    .load_tests
                    .iter()
                    .any(|config| config.name.eq_ignore_ascii_case(wanted))
                {
                    anyhow::bail!(
                        "Unknown scenario [{wanted}], available: {}",
                        self.load_tests
                            .iter()
                            .map(|config| config.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }

            self.load_tests.retain(|config| {
                cli.scenario
                    .iter()
                    .any(|wanted| config.name.eq_ignore_ascii_case(wanted))
            });
        }

        for config in &mut self.load_tests {
            if let Some(users) = cli.users {
                config.concurrent_users = users;
            }
            if let Some(duration) = cli.duration {
                config.duration_ms = duration * 1000;
            }
        }

        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }

        if let Some(window) = cli.monitor_window {
            self.monitor_window_ms = window * 1000;
        }

        for stage in &cli.skip {
            self.phases.set(*stage, false);
        }

        Ok(())
    }

    pub fn monitor_window(&self) -> Duration {
        Duration::from_millis(self.monitor_window_ms)
    }

    /// Build the simulated driver described by [AuditConfig::simulation].
    pub fn simulated_driver(&self) -> AuditResult<SimulatedDriver> {
        let mut model = SimulatedOutcomeModel::new(self.simulation.default);
        for (traffic_class, params) in &self.simulation.traffic_classes {
            model = model.with_traffic_class(traffic_class, *params);
        }
        if let Some(seed) = self.seed {
            model = model.with_seed(seed);
        }
        model.validate()?;

        Ok(SimulatedDriver::new(model))
    }

    /// Build an orchestrator for this config. Load test configs are validated when they run.
    pub fn orchestrator(&self, driver: Arc<dyn RequestDriver>) -> AuditResult<AuditOrchestrator> {
        let calculator = ScoreCalculator::new(self.score.clone())?;

        let mut orchestrator = AuditOrchestrator::new(driver)
            .with_load_tests(self.load_tests.clone())
            .with_toggles(self.phases)
            .with_score_calculator(calculator)
            .with_attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
            .with_monitor(self.monitor, self.monitor_window())?;

        if let Some(seed) = self.seed {
            orchestrator = orchestrator.with_seed(seed);
        }

        Ok(orchestrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn load_test(name: &str) -> LoadTestConfig {
        LoadTestConfig {
            name: name.to_string(),
            concurrent_users: 10,
            duration_ms: 60_000,
            requests_per_second_per_user: 1.0,
            ramp_up_ms: 5000,
            traffic_classes: vec!["card".to_string()],
        }
    }

    #[test]
    fn load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
seed = 42
monitor_window_ms = 5000

[phases]
integration = false

[monitor]
interval_ms = 1000

[simulation.traffic_classes.bank_transfer]
base_latency_ms = 1200.0
latency_variance_pct = 20.0
success_probability = 0.97

[[load_tests]]
name = "Baseline"
concurrent_users = 10
duration_ms = 60000
requests_per_second_per_user = 1.0
traffic_classes = ["card", "bank_transfer"]
"#
        )
        .unwrap();

        let config = AuditConfig::load_from_file(file.path()).unwrap();

        assert_eq!(Some(42), config.seed);
        assert_eq!(Duration::from_secs(5), config.monitor_window());
        assert!(!config.phases.integration);
        assert!(config.phases.security);
        assert_eq!(1000, config.monitor.interval_ms);
        assert_eq!(300_000, config.monitor.retention_ms);
        assert_eq!(1, config.load_tests.len());
        assert_eq!(0, config.load_tests[0].ramp_up_ms);
        assert_eq!(
            1200.0,
            config.simulation.traffic_classes["bank_transfer"].base_latency_ms
        );
        assert_eq!(30_000, config.attempt_timeout_ms);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuditConfig::load_from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read audit config"));
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut config = AuditConfig {
            load_tests: vec![load_test("Baseline"), load_test("Stress")],
            ..Default::default()
        };
        let cli = AuditCli::parse_from([
            "payment_audit",
            "--scenario",
            "stress",
            "--users",
            "3",
            "--duration",
            "2",
            "--seed",
            "7",
            "--monitor-window",
            "1",
            "--skip",
            "database",
            "--skip",
            "load-test",
        ]);

        config.apply_cli(&cli).unwrap();

        assert_eq!(1, config.load_tests.len());
        assert_eq!("Stress", config.load_tests[0].name);
        assert_eq!(3, config.load_tests[0].concurrent_users);
        assert_eq!(2000, config.load_tests[0].duration_ms);
        assert_eq!(Some(7), config.seed);
        assert_eq!(1000, config.monitor_window_ms);
        assert!(!config.phases.is_enabled(AuditStage::Database));
        assert!(!config.phases.is_enabled(AuditStage::LoadTest));
        assert!(config.phases.is_enabled(AuditStage::Security));
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let mut config = AuditConfig {
            load_tests: vec![load_test("Baseline")],
            ..Default::default()
        };
        let cli = AuditCli::parse_from(["payment_audit", "--scenario", "Soak"]);

        let err = config.apply_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("Unknown scenario [Soak]"));
    }

    #[test]
    fn invalid_simulation_params_are_rejected() {
        let mut config = AuditConfig::default();
        config.simulation.default.success_probability = 2.0;

        assert!(config.simulated_driver().is_err());
    }

    #[test]
    fn invalid_score_policy_is_rejected() {
        let mut config = AuditConfig::default();
        config.score.security_weight = -1.0;

        let driver = Arc::new(config.simulated_driver().unwrap());
        assert!(config.orchestrator(driver).is_err());
    }
}
