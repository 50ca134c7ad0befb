use log::{info, warn};

use quiz_session::{QuizRules, Session, SessionErrors};
use snafu::{prelude::*, Snafu};

use std::time::Duration;

pub mod config_reader;
pub mod github;
pub mod io_common;
pub mod io_results;
pub mod io_source;
pub mod terminal;

use crate::quiz::config_reader::QuizConfig;
use crate::quiz::github::GithubClient;
use crate::quiz::io_results::{Publisher, RemoteTarget};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum QuizError {
    #[snafu(display("Failed to fetch quiz data. Status Code: {status}"))]
    SourceStatus { status: u16 },
    #[snafu(display("Error contacting {url}"))]
    Http { source: reqwest::Error, url: String },
    #[snafu(display("Error opening spreadsheet {name}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        name: String,
    },
    #[snafu(display("Spreadsheet {name} has no worksheet"))]
    EmptyExcel { name: String },
    #[snafu(display("Quiz data is empty. Please check the source file."))]
    EmptyQuizData {},
    #[snafu(display("The quiz data file is missing required columns: {}", missing.join(", ")))]
    MissingColumns { missing: Vec<String> },
    #[snafu(display("Error writing spreadsheet"))]
    WritingExcel { source: rust_xlsxwriter::XlsxError },
    #[snafu(display("Error accessing file {path}"))]
    LocalFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening config file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("No repository owner configured (use --owner or the config file)"))]
    MissingOwner {},
    #[snafu(display("Error decoding the content of {path}"))]
    DecodingContent {
        source: base64::DecodeError,
        path: String,
    },
    #[snafu(display("Request on {path} returned status {status}: {body}"))]
    ResultsStatus {
        status: u16,
        path: String,
        body: String,
    },
    #[snafu(display("{source}"))]
    Session { source: SessionErrors },
    #[snafu(display("Error writing to the terminal"))]
    Terminal { source: std::io::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type QuizResult<T> = Result<T, QuizError>;

/// Runs one quiz session in the terminal, from the identity form to the
/// publication of the score.
pub fn run_quiz(config: &QuizConfig) -> QuizResult<()> {
    info!("config: {:?}", config);
    let token = config.token();
    let host = GithubClient::new(config, token.clone())?;

    let remote = if !config.remote_results() {
        info!("Remote results disabled");
        None
    } else if token.is_none() {
        warn!(
            "No credential found in ${}: results will not be saved to GitHub",
            config.token_env()
        );
        None
    } else {
        Some(RemoteTarget {
            path: config.results_file(),
            message: config.commit_message(),
        })
    };
    let publisher = Publisher::new(remote, config.local_results_file().map(Into::into));

    let rules = QuizRules {
        duration_secs: config.duration_seconds(),
    };
    let mut session = Session::new(&rules);
    terminal::run_terminal(
        &mut session,
        &host,
        &config.quiz_file(),
        &publisher,
        Duration::from_secs(1),
    )
}
