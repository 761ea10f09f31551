use std::sync::Arc;

use gust_core::prelude::DelegatedShutdownListener;
use gust_instruments::Reporter;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::time::MissedTickBehavior;

use crate::executor::Executor;

/// Commands from the pacer and the VUs back to the run loop, which owns thread spawning.
pub(crate) enum PoolCommand {
    /// Every VU was busy when an iteration came due and the pool is below its maximum, so a
    /// new VU should be started.
    Grow,
    /// A VU thread has finished.
    VuFinished,
    /// The run is shutting down.
    Shutdown,
}

/// Issue one iteration token per scheduling slot at the configured arrival rate.
///
/// Idle VUs block on the token channel, so a token is consumed as soon as any VU is free.
/// When no VU picks a token up, the pacer asks the run loop to grow the pool; once the pool is
/// at its maximum the iteration is dropped and counted, never queued without bound. Missed
/// ticks burst so that the average rate holds even when the pacer falls behind briefly.
pub(crate) fn start_pacer(
    executor: &Executor,
    rate_per_second: f64,
    min_vus: usize,
    max_vus: usize,
    token_tx: Sender<()>,
    pool_tx: std::sync::mpsc::Sender<PoolCommand>,
    reporter: Arc<Reporter>,
    mut shutdown_listener: DelegatedShutdownListener,
) {
    let period = std::time::Duration::from_secs_f64(1.0 / rate_per_second);

    executor.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let mut pool_size = min_vus;
        loop {
            tokio::select! {
                _ = shutdown_listener.wait_for_shutdown() => {
                    log::debug!("Pacer shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match token_tx.try_send(()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            if pool_size < max_vus {
                                pool_size += 1;
                                log::debug!("All VUs busy, growing the pool to {pool_size}");
                                if pool_tx.send(PoolCommand::Grow).is_err() {
                                    break;
                                }
                                // Hold this iteration for the new VU rather than dropping it,
                                // but never block past the next slot.
                                if token_tx.send_timeout((), period).await.is_err() {
                                    reporter.add_dropped_iterations(1);
                                }
                            } else {
                                log::debug!("Dropping iteration, all {pool_size} VUs are busy");
                                reporter.add_dropped_iterations(1);
                            }
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                }
            }
        }
    });
}
