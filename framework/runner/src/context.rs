use std::{fmt::Debug, sync::Arc};

use crate::executor::Executor;
use gust_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use gust_instruments::Reporter;

/// Constraint on the user-defined values carried by the runner and VU contexts.
pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// Run-scoped context shared by all VUs.
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    connection_string: String,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        connection_string: String,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            connection_string,
            value: Default::default(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    /// The target that this run drives load against.
    pub fn get_connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Stop the scenario ahead of its configured duration. Mainly useful in tests.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Per-VU context. One VU runs one iteration at a time; iterations share nothing beyond the
/// reporter owned by the runner context.
pub struct VuContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    vu_id: String,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> VuContext<RV, V> {
    pub(crate) fn new(
        vu_id: String,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            vu_id,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    pub fn vu_id(&self) -> &str {
        &self.vu_id
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    /// Listener for behaviour implementations that want to react to shutdown while work is in
    /// flight. Most behaviours do not need this because
    /// [Executor::execute_in_place](crate::prelude::Executor::execute_in_place) already races
    /// the shutdown signal.
    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
