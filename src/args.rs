use clap::Parser;

/// A timed multiple-choice quiz, fed from a spreadsheet kept in a GitHub repository.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the quiz: repository owner and name, file
    /// names, duration. See the documentation of `quiz_session::manual` for the file formats.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// The owner (user or organization) of the repository holding the quiz and the results.
    /// Overrides the value of the config file.
    #[clap(long, value_parser)]
    pub owner: Option<String>,

    /// (seconds, default 60) The time allowed to answer the quiz.
    #[clap(short, long, value_parser)]
    pub duration: Option<u64>,

    /// (file path) Where to keep a local copy of the results table.
    #[clap(long, value_parser)]
    pub local_results: Option<String>,

    /// If passed as an argument, the results are not written to the GitHub repository.
    #[clap(long, takes_value = false)]
    pub no_remote_results: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
