use gust_core::prelude::DelegatedShutdownListener;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::fmt::Write;
use std::time::{Duration, Instant};

/// Displays a progress bar while the test is running to show the user how long is left.
pub(crate) fn start_progress(
    planned_runtime: Duration,
    mut shutdown_listener: DelegatedShutdownListener,
) {
    std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let started = Instant::now();
            let total_secs = planned_runtime.as_secs();
            let label = format_hms(planned_runtime);

            let bar = ProgressBar::new(total_secs);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}]",
                )
                .expect("Failed to set progress style")
                .with_key(
                    "planned_runtime",
                    move |_state: &ProgressState, w: &mut dyn Write| {
                        w.write_str(&label).expect("Could not write planned runtime")
                    },
                )
                .progress_chars("#>-"),
            );

            while !shutdown_listener.should_shutdown() {
                bar.set_position(started.elapsed().as_secs().min(total_secs));
                std::thread::sleep(Duration::from_millis(500));
            }

            log::trace!("Progress thread shutting down");
            bar.finish_and_clear();
        })
        .expect("Failed to start progress thread");
}

fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
