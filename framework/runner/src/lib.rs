mod cli;
mod context;
mod definition;
mod executor;
mod init;
mod monitor;
mod pacer;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{ReporterOpt, ScenarioCli};
    pub use crate::context::{RunnerContext, UserValuesConstraint, VuContext};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::executor::Executor;
    pub use crate::run::run;
    pub use crate::types::GustResult;
    pub use gust_core::prelude::{
        DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError, VuBailError,
    };
    pub use gust_instruments::{OperationRecord, Reporter, RunReport, Threshold};
}
