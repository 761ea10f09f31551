use crate::cli::ScenarioCli;
use clap::Parser;

/// Initialise logging and parse the CLI for a scenario binary.
pub fn init() -> ScenarioCli {
    env_logger::init();

    ScenarioCli::parse()
}
