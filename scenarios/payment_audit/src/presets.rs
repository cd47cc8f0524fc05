use load_audit_runner::prelude::{AuditConfig, LoadTestConfig, OutcomeParams, SimulationConfig};

const PAYMENT_METHODS: [&str; 5] = ["card", "pix", "bank_transfer", "digital_wallet", "boleto"];

fn preset(
    name: &str,
    concurrent_users: u32,
    duration_s: u64,
    requests_per_second_per_user: f64,
    ramp_up_s: u64,
) -> LoadTestConfig {
    LoadTestConfig {
        name: name.to_string(),
        concurrent_users,
        duration_ms: duration_s * 1000,
        requests_per_second_per_user,
        ramp_up_ms: ramp_up_s * 1000,
        traffic_classes: PAYMENT_METHODS.iter().map(|m| m.to_string()).collect(),
    }
}

/// The scenario catalog used when the config file names none.
pub fn load_tests() -> Vec<LoadTestConfig> {
    vec![
        preset("Baseline", 10, 60, 1.0, 10),
        preset("Peak Load", 100, 120, 2.0, 30),
        preset("Stress", 250, 180, 3.0, 60),
        preset("Spike", 200, 30, 5.0, 2),
        preset("Endurance", 50, 600, 1.0, 30),
    ]
}

/// Response profile of each payment method against the sandbox gateway.
pub fn simulation() -> SimulationConfig {
    let params = |base_latency_ms, latency_variance_pct, success_probability| OutcomeParams {
        base_latency_ms,
        latency_variance_pct,
        success_probability,
    };

    SimulationConfig {
        default: OutcomeParams::default(),
        traffic_classes: [
            ("card", params(450.0, 40.0, 0.985)),
            ("pix", params(300.0, 30.0, 0.995)),
            ("bank_transfer", params(1200.0, 50.0, 0.97)),
            ("digital_wallet", params(350.0, 40.0, 0.99)),
            ("boleto", params(800.0, 35.0, 0.98)),
        ]
        .into_iter()
        .map(|(method, params)| (method.to_string(), params))
        .collect(),
    }
}

/// Fill in whatever the config file left out.
pub fn apply_defaults(config: &mut AuditConfig) {
    if config.load_tests.is_empty() {
        config.load_tests = load_tests();
    }
    if config.simulation.traffic_classes.is_empty() {
        config.simulation = simulation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        let presets = load_tests();
        assert_eq!(5, presets.len());
        for preset in &presets {
            preset.validate().unwrap();
        }
    }

    #[test]
    fn every_payment_method_has_a_profile() {
        let simulation = simulation();
        for method in PAYMENT_METHODS {
            simulation.traffic_classes[method].validate(method).unwrap();
        }
    }

    #[test]
    fn file_values_win_over_defaults() {
        let mut config = AuditConfig {
            load_tests: vec![preset("Smoke", 1, 5, 1.0, 0)],
            ..Default::default()
        };

        apply_defaults(&mut config);

        assert_eq!(1, config.load_tests.len());
        assert_eq!(5, config.simulation.traffic_classes.len());
    }
}
