use clap::Parser;

/// Estimates the cost of risk-limiting audits of U.S. federal elections.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the input files, the cost model and the output directory.
    /// Relative paths inside it are resolved against the directory of the configuration file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) A data directory with the default layout (house/, senate/, presidential/).
    /// Files found there fill in the inputs not given by --config.
    #[clap(short, long, value_parser)]
    pub data_dir: Option<String>,

    /// (directory) Where the reports are written. Setting this option overrides the directory that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (directory, optional) A directory of reference reports. If provided, each generated report is compared
    /// with the file of the same name and the run fails on any difference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (chartSample or ballotsCast) How the House audits are sized. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub house_model: Option<String>,

    /// (minutes) Time spent on one audited ballot. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub per_ballot_minutes: Option<f64>,

    /// If passed as an argument, malformed rows in the sources are fatal instead of being dropped.
    #[clap(long, takes_value = false)]
    pub strict: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
