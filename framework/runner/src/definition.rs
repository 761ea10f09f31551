use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::{ReporterOpt, ScenarioCli};
use crate::context::{RunnerContext, UserValuesConstraint, VuContext};
use crate::init;
use gust_instruments::Threshold;

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type VuHookMut<RV, V> = fn(&mut VuContext<RV, V>) -> HookResult;

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario binary to declare the load shape, thresholds
/// and hooks for the run. Values from the CLI override what the scenario declares.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: ScenarioCli,
    /// The target to drive load against when the CLI does not override it.
    connection_string: Option<String>,
    /// Iteration starts per second. Independent of how long each iteration takes.
    rate_per_second: f64,
    /// How long to run for when the CLI does not override it.
    default_duration_s: Option<u64>,
    /// VUs started before load generation begins.
    min_vus: usize,
    /// Hard upper bound on the VU pool. Defaults to `min_vus`.
    max_vus: Option<usize>,
    thresholds: Vec<Threshold>,
    /// Where the HTML report artifact is written.
    report_path: PathBuf,
    /// Global setup hook. Runs once, before any VUs are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Setup hook for a VU, run once as each VU starts.
    setup_vu_fn: Option<VuHookMut<RV, V>>,
    /// The per-iteration behaviour. Invoked once per scheduling slot granted by the pacer.
    vu_behaviour: Option<VuHookMut<RV, V>>,
    /// Teardown hook for a VU, run once as each VU stops. Best effort.
    teardown_vu_fn: Option<VuHookMut<RV, V>>,
    /// Global teardown hook. Runs once, after every VU has stopped. Best effort.
    teardown_fn: Option<GlobalHook<RV>>,
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub name: String,
    pub run_id: String,
    pub connection_string: String,
    pub rate_per_second: f64,
    pub duration_s: Option<u64>,
    pub min_vus: usize,
    pub max_vus: usize,
    pub thresholds: Vec<Threshold>,
    pub reporter: ReporterOpt,
    pub no_progress: bool,
    pub report_path: PathBuf,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub setup_vu_fn: Option<VuHookMut<RV, V>>,
    pub vu_behaviour: Option<VuHookMut<RV, V>>,
    pub teardown_vu_fn: Option<VuHookMut<RV, V>>,
    pub teardown_fn: Option<GlobalHook<RV>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Initialise a new scenario definition from the scenario name and command line arguments.
    pub fn new(name: &str, cli: ScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            connection_string: None,
            rate_per_second: 1.0,
            default_duration_s: None,
            min_vus: 1,
            max_vus: None,
            thresholds: Vec::new(),
            report_path: PathBuf::from("load-test-summary.html"),
            setup_fn: None,
            setup_vu_fn: None,
            vu_behaviour: None,
            teardown_vu_fn: None,
            teardown_fn: None,
        }
    }

    /// Initialise a new scenario definition, setting up logging and parsing the command line.
    /// This is what a scenario `main` should call.
    pub fn new_with_init(name: &str) -> Self {
        let cli = init::init();
        Self::new(name, cli)
    }

    /// The target to drive load against when the `--connection-string` flag is not given.
    pub fn with_default_connection_string(mut self, connection_string: &str) -> Self {
        self.connection_string = Some(connection_string.to_string());
        self
    }

    /// The arrival rate: how many iterations to start per second, regardless of how long each
    /// iteration takes.
    pub fn with_rate_per_second(mut self, rate_per_second: f64) -> Self {
        self.rate_per_second = rate_per_second;
        self
    }

    /// How long to run for when the `--duration` flag is not given.
    pub fn with_default_duration_s(mut self, duration_s: u64) -> Self {
        self.default_duration_s = Some(duration_s);
        self
    }

    /// The number of VUs to start before load generation begins.
    pub fn with_min_vus(mut self, min_vus: usize) -> Self {
        self.min_vus = min_vus;
        self
    }

    /// The hard upper bound on the VU pool. The pool grows on demand when every VU is busy at
    /// the moment an iteration is due to start.
    pub fn with_max_vus(mut self, max_vus: usize) -> Self {
        self.max_vus = Some(max_vus);
        self
    }

    /// Declare a run-level threshold, evaluated against the aggregated statistics at run end.
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.thresholds.push(threshold);
        self
    }

    /// Where the HTML report artifact is written. Defaults to `load-test-summary.html` in the
    /// working directory.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    /// Set the global setup hook for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the VU setup hook for this scenario.
    pub fn use_vu_setup(mut self, setup_vu_fn: VuHookMut<RV, V>) -> Self {
        self.setup_vu_fn = Some(setup_vu_fn);
        self
    }

    /// Set the per-iteration behaviour for this scenario.
    pub fn use_vu_behaviour(mut self, behaviour: VuHookMut<RV, V>) -> Self {
        self.vu_behaviour = Some(behaviour);
        self
    }

    /// Set the VU teardown hook for this scenario.
    pub fn use_vu_teardown(mut self, teardown_vu_fn: VuHookMut<RV, V>) -> Self {
        self.teardown_vu_fn = Some(teardown_vu_fn);
        self
    }

    /// Set the global teardown hook for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let connection_string = self
            .cli
            .connection_string
            .or(self.connection_string)
            .context("No connection string: pass --connection-string or declare a default")?;

        let duration_s = if self.cli.soak {
            None
        } else {
            let duration = self.cli.duration.or(self.default_duration_s).context(
                "No duration: pass --duration, declare a default, or run with --soak",
            )?;
            Some(duration)
        };

        anyhow::ensure!(
            self.rate_per_second > 0.0,
            "The arrival rate must be positive"
        );
        anyhow::ensure!(self.min_vus >= 1, "At least one VU is required");

        let max_vus = self.max_vus.unwrap_or(self.min_vus);
        anyhow::ensure!(
            max_vus >= self.min_vus,
            "The maximum VU count must not be below the minimum"
        );

        let run_id = self.cli.run_id.unwrap_or_else(|| nanoid::nanoid!());

        Ok(ScenarioDefinition {
            name: self.name,
            run_id,
            connection_string,
            rate_per_second: self.rate_per_second,
            duration_s,
            min_vus: self.min_vus,
            max_vus,
            thresholds: self.thresholds,
            reporter: self.cli.reporter,
            no_progress: self.cli.no_progress,
            report_path: self.report_path,
            setup_fn: self.setup_fn,
            setup_vu_fn: self.setup_vu_fn,
            vu_behaviour: self.vu_behaviour,
            teardown_vu_fn: self.teardown_vu_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}
