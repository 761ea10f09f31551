use clap::{Parser, ValueEnum};

/// Command line arguments for a Gust scenario.
///
/// Every flag is an optional override of what the scenario declares, so a scenario binary run
/// without any arguments behaves exactly as written.
#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct ScenarioCli {
    /// The URL of the endpoint to drive load against, overriding the scenario's declared
    /// target
    #[clap(short, long)]
    pub connection_string: Option<String>,

    /// The number of seconds to run the scenario for, overriding the scenario's declared
    /// duration
    #[clap(long)]
    pub duration: Option<u64>,

    /// Run this test as a soak test, ignoring any configured duration and continuing to run
    /// until stopped
    #[clap(long, default_value = "false")]
    pub soak: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at
    /// by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Which report output to produce at the end of the run
    #[clap(long, value_enum, default_value_t = ReporterOpt::Both)]
    pub reporter: ReporterOpt,

    /// An identifier for this run. Generated if not provided.
    #[clap(long)]
    pub run_id: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterOpt {
    /// Print a summary table to the console
    Summary,
    /// Write the HTML report artifact
    Html,
    /// Both the console summary and the HTML artifact
    Both,
    /// No report output, useful for tests
    Noop,
}
