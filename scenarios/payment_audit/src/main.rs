mod catalog;
mod presets;
mod report;

use load_audit_runner::prelude::*;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> AuditResult<ExitCode> {
    let cli = init();

    let mut config = match &cli.config {
        Some(path) => AuditConfig::load_from_file(path)?,
        None => AuditConfig::default(),
    };
    presets::apply_defaults(&mut config);
    config.apply_cli(&cli)?;

    let shutdown = start_shutdown_listener();
    let driver = Arc::new(config.simulated_driver()?);

    let orchestrator = catalog::phases()
        .into_iter()
        .fold(config.orchestrator(driver)?, |orchestrator, phase| {
            orchestrator.with_phase(phase)
        })
        .with_shutdown(shutdown)
        .with_progress(!cli.no_progress);

    let report = orchestrator.run().await;
    report::print_report(&report);

    if let Some(dir) = &cli.report_dir {
        let path = report::write_report(&report, dir)?;
        println!("Report written to {}", path.display());
    }

    Ok(ExitCode::from(report::exit_code(report.summary.overall_status)))
}
