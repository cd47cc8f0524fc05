use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use load_audit_core::prelude::DelegatedShutdownListener;
use std::cmp::min;
use std::fmt::Write;
use std::time::{Duration, Instant};

/// Displays a progress bar while a load test is running to show the user how long is left.
///
/// The bar is cleared when the listener observes shutdown.
pub fn start_progress(
    label: &str,
    planned_runtime: Duration,
    mut shutdown_listener: DelegatedShutdownListener,
) -> anyhow::Result<()> {
    let hours = planned_runtime.as_secs() / 3600;
    let minutes = (planned_runtime.as_secs() % 3600) / 60;
    let seconds = planned_runtime.as_secs() % 60;

    let style = ProgressStyle::with_template(
        "{spinner:.green} {prefix} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}]",
    )?
    .with_key(
        "planned_runtime",
        move |_state: &ProgressState, w: &mut dyn Write| {
            let _ = write!(w, "{hours:02}:{minutes:02}:{seconds:02}");
        },
    )
    .progress_chars("#>-");

    let pb = ProgressBar::new(planned_runtime.as_millis() as u64)
        .with_style(style)
        .with_prefix(label.to_string());

    std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let start_time = Instant::now();

            loop {
                if shutdown_listener.should_shutdown() {
                    log::trace!("Progress thread shutting down");
                    pb.finish_and_clear();
                    break;
                }

                let new = min(
                    start_time.elapsed().as_millis() as u64,
                    planned_runtime.as_millis() as u64,
                );
                pb.set_position(new);
                std::thread::sleep(Duration::from_millis(250));
            }
        })?;

    Ok(())
}
