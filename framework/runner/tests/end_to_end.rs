use load_audit_runner::prelude::{
    AuditConfig, AuditStatus, Grade, LoadTestConfig, LoadTestScheduler, OutcomeParams,
    SimulatedDriver, SimulatedOutcomeModel,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn single_user_config() -> LoadTestConfig {
    LoadTestConfig {
        name: "Single User".to_string(),
        concurrent_users: 1,
        duration_ms: 1000,
        requests_per_second_per_user: 1.0,
        ramp_up_ms: 0,
        traffic_classes: vec!["card".to_string()],
    }
}

#[tokio::test(start_paused = true)]
async fn single_user_single_request() {
    let driver = SimulatedDriver::new(SimulatedOutcomeModel::new(OutcomeParams::fixed(100.0)));
    let scheduler = LoadTestScheduler::new(Arc::new(driver));
    let config = single_user_config();

    let started = tokio::time::Instant::now();
    let metrics = scheduler.run(&config).await.unwrap().into_metrics(&config);

    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert_eq!(1, metrics.total_requests);
    assert_eq!(1, metrics.successful_requests);
    assert_eq!(0.0, metrics.error_rate);
    assert_eq!(100.0, metrics.p50_response_time);
    assert_eq!(100.0, metrics.avg_response_time);
    assert!((metrics.throughput - 1.0).abs() < 0.01);
    assert_eq!(1, metrics.by_traffic_class["card"].total_requests);
}

#[tokio::test(start_paused = true)]
async fn seeded_audit_from_config() {
    let mut config = AuditConfig {
        load_tests: vec![
            single_user_config(),
            LoadTestConfig {
                name: "Peak Load".to_string(),
                concurrent_users: 20,
                duration_ms: 10_000,
                requests_per_second_per_user: 2.0,
                ramp_up_ms: 2000,
                traffic_classes: vec!["card".to_string(), "wallet".to_string()],
            },
        ],
        monitor_window_ms: 3000,
        seed: Some(1234),
        ..Default::default()
    };
    config.simulation.default = OutcomeParams {
        base_latency_ms: 400.0,
        latency_variance_pct: 50.0,
        success_probability: 1.0,
    };

    let driver = Arc::new(config.simulated_driver().unwrap());
    let report = config.orchestrator(driver).unwrap().run().await;

    assert_eq!(2, report.performance.len());
    assert_eq!(1 + 20 * 20, report.performance.iter().map(|m| m.total_requests).sum::<u64>());
    for metrics in &report.performance {
        assert_eq!(0, metrics.failed_requests);
        assert!(metrics.min_response_time >= 300.0);
        assert!(metrics.max_response_time <= 500.0);
    }

    assert_eq!(Some(Grade::APlus), report.summary.performance_grade);
    assert_eq!(AuditStatus::Pass, report.summary.overall_status);

    let monitoring = report.summary.monitoring.unwrap();
    assert!(monitoring.sample_count >= 4);
}
