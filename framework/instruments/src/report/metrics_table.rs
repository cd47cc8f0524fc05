use tabled::Tabled;

#[derive(Tabled)]
pub struct MetricsRow {
    pub test_name: String,
    pub total_requests: u64,
    #[tabled(display = "float2")]
    pub error_rate_pct: f64,
    #[tabled(display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(display = "float2")]
    pub p50_time_ms: f64,
    #[tabled(display = "float2")]
    pub p95_time_ms: f64,
    #[tabled(display = "float2")]
    pub p99_time_ms: f64,
    #[tabled(display = "float2")]
    pub max_time_ms: f64,
    #[tabled(display = "float2")]
    pub throughput_rps: f64,
}

#[derive(Tabled)]
pub struct TrafficClassRow {
    pub test_name: String,
    pub traffic_class: String,
    pub total_requests: u64,
    #[tabled(display = "float2")]
    pub error_rate_pct: f64,
    #[tabled(display = "float2")]
    pub avg_time_ms: f64,
    #[tabled(display = "float2")]
    pub p95_time_ms: f64,
}

#[derive(Tabled)]
pub struct PhaseRow {
    pub phase: String,
    pub name: String,
    pub tests_run: u32,
    pub passed: u32,
    pub failed: u32,
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
