use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::cli::ReporterOpt;
use crate::context::{RunnerContext, UserValuesConstraint, VuContext};
use crate::definition::{ScenarioDefinition, ScenarioDefinitionBuilder};
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::pacer::{start_pacer, PoolCommand};
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;
use gust_core::prelude::{ShutdownHandle, ShutdownSignalError, VuBailError};
use gust_instruments::{ReportConfig, RunReport};

type TokenReceiver = Arc<tokio::sync::Mutex<tokio::sync::mpsc::Receiver<()>>>;

/// Run a scenario to completion and return the aggregated report.
///
/// The run ends when the configured duration elapses, when Ctrl-C is received, or when every
/// VU has stopped. Thresholds are evaluated against the returned report; a breached threshold
/// does not make this function return an error, so that the caller can decide how to surface
/// the failure.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario {} (run id {}) against {}",
        definition.name,
        definition.run_id,
        definition.connection_string
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));

    let mut report_config = ReportConfig::default();
    match definition.reporter {
        ReporterOpt::Summary => report_config = report_config.enable_summary(),
        ReporterOpt::Html => {
            report_config = report_config.enable_html(definition.report_path.clone())
        }
        ReporterOpt::Both => {
            report_config = report_config
                .enable_summary()
                .enable_html(definition.report_path.clone())
        }
        ReporterOpt::Noop => {}
    }
    let reporter = Arc::new(report_config.init(&definition.name, &definition.run_id));

    let mut runner_context = RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle.clone(),
        definition.connection_string.clone(),
    );

    if let Some(setup_fn) = &definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    // For a time-bounded scenario, arm the timer that ends the run and show the user how long
    // is left.
    if let Some(duration) = definition.duration_s {
        if !definition.no_progress {
            start_progress(
                Duration::from_secs(duration),
                shutdown_handle.new_listener(),
            );
        }

        let timer_shutdown_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(Duration::from_secs(duration)).await;
            timer_shutdown_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);
    let runner_context_for_teardown = runner_context.clone();

    // Warn if the driver itself gets busy enough to distort the measurements.
    start_monitor(shutdown_handle.new_listener());

    // The pacer grants iteration slots through this channel; idle VUs block on it. Capacity 1
    // means at most one iteration is ever waiting for a VU.
    let (token_tx, token_rx) = tokio::sync::mpsc::channel::<()>(1);
    let token_rx: TokenReceiver = Arc::new(tokio::sync::Mutex::new(token_rx));
    let (pool_tx, pool_rx) = std::sync::mpsc::channel::<PoolCommand>();

    start_pacer(
        runner_context.executor(),
        definition.rate_per_second,
        definition.min_vus,
        definition.max_vus,
        token_tx,
        pool_tx.clone(),
        reporter.clone(),
        shutdown_handle.new_listener(),
    );

    // Wake the pool loop below when the run shuts down.
    {
        let pool_tx = pool_tx.clone();
        let mut shutdown_listener = shutdown_handle.new_listener();
        runner_context.executor().spawn(async move {
            shutdown_listener.wait_for_shutdown().await;
            let _ = pool_tx.send(PoolCommand::Shutdown);
        });
    }

    let mut handles = Vec::new();
    let mut vu_count = 0;
    for _ in 0..definition.min_vus {
        handles.push(spawn_vu(
            vu_count,
            &definition,
            runner_context.clone(),
            token_rx.clone(),
            shutdown_handle.clone(),
            pool_tx.clone(),
        )?);
        vu_count += 1;
    }

    // The main thread owns the pool: it grows it at the pacer's request and leaves this loop
    // once the run is shutting down or every VU has stopped on its own.
    let mut finished = 0;
    while let Ok(command) = pool_rx.recv() {
        match command {
            PoolCommand::Grow if vu_count < definition.max_vus => {
                handles.push(spawn_vu(
                    vu_count,
                    &definition,
                    runner_context.clone(),
                    token_rx.clone(),
                    shutdown_handle.clone(),
                    pool_tx.clone(),
                )?);
                vu_count += 1;
            }
            PoolCommand::Grow => {}
            PoolCommand::VuFinished => {
                finished += 1;
                if finished >= vu_count {
                    break;
                }
            }
            PoolCommand::Shutdown => break,
        }
    }

    for handle in handles {
        handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining VU thread: {:?}", e))?;
    }

    if let Some(teardown_fn) = definition.teardown_fn {
        // Don't crash the runner if the teardown fails. We still want the reporting to happen
        // cleanly. The hook is documented as best effort.
        if let Err(e) = teardown_fn(runner_context_for_teardown.clone()) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    // Stop the pacer, progress bar and monitor if the run ended before the timer fired.
    shutdown_handle.shutdown();

    let report = reporter.finalize(definition.duration_s, &definition.thresholds);

    for outcome in &report.thresholds {
        if outcome.passed {
            log::info!(
                "Threshold {} {} held, observed {:.2}ms",
                outcome.operation_id,
                outcome.expression,
                outcome.observed_ms
            );
        } else {
            log::error!(
                "Threshold {} {} breached, observed {:.2}ms",
                outcome.operation_id,
                outcome.expression,
                outcome.observed_ms
            );
        }
    }

    Ok(report)
}

fn spawn_vu<RV: UserValuesConstraint, V: UserValuesConstraint>(
    vu_index: usize,
    definition: &ScenarioDefinition<RV, V>,
    runner_context: Arc<RunnerContext<RV>>,
    tokens: TokenReceiver,
    shutdown_handle: ShutdownHandle,
    pool_tx: std::sync::mpsc::Sender<PoolCommand>,
) -> anyhow::Result<std::thread::JoinHandle<()>> {
    let setup_vu_fn = definition.setup_vu_fn;
    let vu_behaviour_fn = definition.vu_behaviour;
    let teardown_vu_fn = definition.teardown_vu_fn;

    // For checking whether the VU should stop between iterations.
    let mut cycle_shutdown_receiver = shutdown_handle.new_listener();
    // For the behaviour implementation to listen for shutdown and respond appropriately.
    let delegated_shutdown_listener = shutdown_handle.new_listener();

    let vu_id = format!("vu-{}", vu_index);

    std::thread::Builder::new()
        .name(vu_id.clone())
        .spawn(move || {
            let mut context =
                VuContext::new(vu_id.clone(), runner_context.clone(), delegated_shutdown_listener);

            if let Some(setup_vu_fn) = setup_vu_fn {
                if let Err(e) = setup_vu_fn(&mut context) {
                    log::error!("VU setup failed for {}: {:?}", vu_id, e);
                    let _ = pool_tx.send(PoolCommand::VuFinished);
                    return;
                }
            }

            if let Some(behaviour) = vu_behaviour_fn {
                loop {
                    if cycle_shutdown_receiver.should_shutdown() {
                        log::debug!("Stopping {}", vu_id);
                        break;
                    }

                    // Wait for the pacer to grant the next iteration slot.
                    let token = {
                        let tokens = tokens.clone();
                        runner_context.executor().execute_in_place(async move {
                            Ok::<_, anyhow::Error>(tokens.lock().await.recv().await)
                        })
                    };
                    match token {
                        Ok(Some(())) => {}
                        // The pacer has gone away, there will be no more iterations.
                        Ok(None) => break,
                        // Shutdown raced the wait, the check at the top of the loop exits.
                        Err(_) => continue,
                    }

                    match behaviour(&mut context) {
                        Ok(()) => {}
                        Err(e) if e.is::<ShutdownSignalError>() => {
                            // Expected when shutdown interrupts an in-flight iteration. The
                            // check at the top of the loop will catch this and break out.
                        }
                        Err(e) if e.is::<VuBailError>() => {
                            log::info!("{} is bailing", vu_id);
                            break;
                        }
                        Err(e) => {
                            log::error!("VU behaviour failed: {:?}", e);
                        }
                    }
                }
            }

            if let Some(teardown_vu_fn) = teardown_vu_fn {
                if let Err(e) = teardown_vu_fn(&mut context) {
                    log::error!("VU teardown failed for {}: {:?}", vu_id, e);
                }
            }

            let _ = pool_tx.send(PoolCommand::VuFinished);
        })
        .context("Failed to spawn VU thread")
}
