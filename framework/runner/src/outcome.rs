use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use load_audit_core::prelude::{Clock, ConfigError, TokioClock};
use load_audit_summary_model::RequestOutcome;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Parameters that shape the simulated responses for one traffic class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OutcomeParams {
    /// Mean latency in milliseconds
    pub base_latency_ms: f64,
    /// Width of the uniform latency spread, as a percentage of the base latency
    pub latency_variance_pct: f64,
    /// Probability between 0 and 1 that a request succeeds
    pub success_probability: f64,
}

impl Default for OutcomeParams {
    fn default() -> Self {
        Self {
            base_latency_ms: 250.0,
            latency_variance_pct: 40.0,
            success_probability: 0.98,
        }
    }
}

impl OutcomeParams {
    /// Always succeeds after exactly `latency_ms`.
    pub fn fixed(latency_ms: f64) -> Self {
        Self {
            base_latency_ms: latency_ms,
            latency_variance_pct: 0.0,
            success_probability: 1.0,
        }
    }

    pub fn validate(&self, traffic_class: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidOutcomeParams {
            traffic_class: traffic_class.to_string(),
            reason: reason.to_string(),
        };

        if !self.base_latency_ms.is_finite() || self.base_latency_ms < 0.0 {
            return Err(invalid("base latency must be a non-negative number"));
        }
        if !self.latency_variance_pct.is_finite() || self.latency_variance_pct < 0.0 {
            return Err(invalid("latency variance must be a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.success_probability) {
            return Err(invalid("success probability must be between 0 and 1"));
        }
        let span = self.variance_span_ms();
        if !span.is_finite() || !(self.base_latency_ms + span / 2.0).is_finite() {
            return Err(invalid("latency spread is too large to simulate"));
        }

        Ok(())
    }

    fn variance_span_ms(&self) -> f64 {
        self.base_latency_ms * self.latency_variance_pct / 100.0
    }
}

/// Draw one simulated request outcome.
///
/// Latency is `base ± span / 2` where the span is `latency_variance_pct` of the base latency,
/// never less than 1ms. Success is a Bernoulli draw. The only state is the random source.
///
/// Unvalidated params never panic: a spread that overflows is dropped and a success
/// probability that is not a number never succeeds.
pub fn simulate<R: Rng + ?Sized>(
    rng: &mut R,
    traffic_class: &str,
    params: &OutcomeParams,
    timestamp: DateTime<Utc>,
) -> RequestOutcome {
    let span = params.variance_span_ms();
    let jitter = if span.is_finite() && span > 0.0 {
        rng.gen_range(-span / 2.0..=span / 2.0)
    } else {
        0.0
    };
    let latency_ms = (params.base_latency_ms + jitter).max(1.0);
    let success_probability = if params.success_probability.is_nan() {
        0.0
    } else {
        params.success_probability.clamp(0.0, 1.0)
    };
    let success = rng.gen_bool(success_probability);

    RequestOutcome::new(traffic_class, success, latency_ms, timestamp)
}

/// The result of executing one request attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptResult {
    pub success: bool,
    pub latency_ms: f64,
}

/// Executes request attempts against the target system.
///
/// The returned future resolves when the request completes. Swap [SimulatedDriver] for an
/// implementation backed by a real client to test a live system.
pub trait RequestDriver: Send + Sync + 'static {
    fn execute(&self, traffic_class: &str) -> BoxFuture<'static, AttemptResult>;
}

/// Holds the outcome parameters for each traffic class and a seedable random source.
#[derive(Debug)]
pub struct SimulatedOutcomeModel {
    default_params: OutcomeParams,
    params: HashMap<String, OutcomeParams>,
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl SimulatedOutcomeModel {
    pub fn new(default_params: OutcomeParams) -> Self {
        Self {
            default_params,
            params: HashMap::new(),
            rng: Mutex::new(StdRng::from_entropy()),
            clock: Arc::new(TokioClock::new()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_traffic_class(mut self, traffic_class: &str, params: OutcomeParams) -> Self {
        self.params.insert(traffic_class.to_string(), params);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_params.validate("default")?;
        for (traffic_class, params) in &self.params {
            params.validate(traffic_class)?;
        }
        Ok(())
    }

    pub fn params_for(&self, traffic_class: &str) -> &OutcomeParams {
        self.params.get(traffic_class).unwrap_or(&self.default_params)
    }

    pub fn simulate(&self, traffic_class: &str) -> RequestOutcome {
        let params = self.params_for(traffic_class);
        simulate(&mut *self.rng.lock(), traffic_class, params, self.clock.now())
    }
}

/// A [RequestDriver] that draws outcomes from a [SimulatedOutcomeModel] and holds each attempt
/// in flight for its simulated latency.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    model: Arc<SimulatedOutcomeModel>,
}

impl SimulatedDriver {
    pub fn new(model: SimulatedOutcomeModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub fn model(&self) -> &SimulatedOutcomeModel {
        &self.model
    }
}

impl RequestDriver for SimulatedDriver {
    fn execute(&self, traffic_class: &str) -> BoxFuture<'static, AttemptResult> {
        let outcome = self.model.simulate(traffic_class);
        async move {
            let latency = Duration::try_from_secs_f64(outcome.latency_ms / 1000.0)
                .unwrap_or(Duration::MAX);
            tokio::time::sleep(latency).await;
            AttemptResult {
                success: outcome.success,
                latency_ms: outcome.latency_ms,
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn latency_stays_within_the_spread() {
        let mut rng = StdRng::seed_from_u64(42);
        let params = OutcomeParams {
            base_latency_ms: 800.0,
            latency_variance_pct: 50.0,
            success_probability: 0.5,
        };

        for _ in 0..1000 {
            let outcome = simulate(&mut rng, "card", &params, now());
            assert!((600.0..=1000.0).contains(&outcome.latency_ms));
            assert_eq!("card", outcome.traffic_class);
        }
    }

    #[test]
    fn latency_is_clamped_to_one_millisecond() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = OutcomeParams {
            base_latency_ms: 0.5,
            latency_variance_pct: 0.0,
            success_probability: 1.0,
        };

        assert_eq!(1.0, simulate(&mut rng, "card", &params, now()).latency_ms);
    }

    #[test]
    fn success_probability_extremes() {
        let mut rng = StdRng::seed_from_u64(3);
        let always = OutcomeParams::fixed(100.0);
        let never = OutcomeParams {
            success_probability: 0.0,
            ..always
        };

        for _ in 0..100 {
            let ok = simulate(&mut rng, "card", &always, now());
            assert!(ok.success);
            assert_eq!(100.0, ok.latency_ms);
            assert!(!simulate(&mut rng, "card", &never, now()).success);
        }
    }

    #[test]
    fn seeded_models_are_reproducible() {
        let draw = |seed| {
            let model = SimulatedOutcomeModel::new(OutcomeParams::default()).with_seed(seed);
            (0..50)
                .map(|_| {
                    let outcome = model.simulate("wallet");
                    (outcome.success, outcome.latency_ms)
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(draw(9), draw(9));
        assert_ne!(draw(9), draw(10));
    }

    #[test]
    fn per_class_params_override_default() {
        let model = SimulatedOutcomeModel::new(OutcomeParams::default())
            .with_traffic_class("bank_transfer", OutcomeParams::fixed(1500.0));

        assert_eq!(1500.0, model.params_for("bank_transfer").base_latency_ms);
        assert_eq!(250.0, model.params_for("card").base_latency_ms);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let model = SimulatedOutcomeModel::new(OutcomeParams::default()).with_traffic_class(
            "card",
            OutcomeParams {
                success_probability: 1.5,
                ..OutcomeParams::default()
            },
        );

        assert!(matches!(
            model.validate(),
            Err(ConfigError::InvalidOutcomeParams { traffic_class, .. }) if traffic_class == "card"
        ));
    }

    #[test]
    fn overflowing_spread_is_rejected_but_still_simulates() {
        let params = OutcomeParams {
            base_latency_ms: 1e308,
            latency_variance_pct: 200.0,
            success_probability: 1.0,
        };
        assert!(matches!(
            params.validate("card"),
            Err(ConfigError::InvalidOutcomeParams { traffic_class, .. }) if traffic_class == "card"
        ));

        let mut rng = StdRng::seed_from_u64(5);
        let outcome = simulate(&mut rng, "card", &params, now());
        assert_eq!(1e308, outcome.latency_ms);
        assert!(outcome.success);

        let not_a_number = OutcomeParams {
            success_probability: f64::NAN,
            ..OutcomeParams::fixed(100.0)
        };
        assert!(!simulate(&mut rng, "card", &not_a_number, now()).success);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_driver_holds_attempt_for_its_latency() {
        let driver =
            SimulatedDriver::new(SimulatedOutcomeModel::new(OutcomeParams::fixed(250.0)));

        let started = tokio::time::Instant::now();
        let result = driver.execute("card").await;

        assert_eq!(
            AttemptResult {
                success: true,
                latency_ms: 250.0
            },
            result
        );
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(252));
    }
}
