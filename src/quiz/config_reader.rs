use crate::args::Args;
use crate::quiz::*;

use log::debug;
use snafu::prelude::*;
use serde::Deserialize;
use std::fs;

pub const DEFAULT_REPO: &str = "sai";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_QUIZ_FILE: &str = "quiz_data.xlsx";
pub const DEFAULT_RESULTS_FILE: &str = "results.xlsx";
pub const DEFAULT_LOCAL_RESULTS_FILE: &str = "sample.xlsx";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Append new quiz score";

fn default_local_results_file() -> Option<String> {
    Some(DEFAULT_LOCAL_RESULTS_FILE.to_string())
}

/// The settings of a quiz, as read from a JSON file.
///
/// Every field except `owner` has a default. Setting `localResultsFile` to
/// `null` turns off the local copy of the results.
#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
pub struct QuizConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    #[serde(rename = "quizFile")]
    pub quiz_file: Option<String>,
    #[serde(rename = "resultsFile")]
    pub results_file: Option<String>,
    #[serde(rename = "localResultsFile", default = "default_local_results_file")]
    pub local_results_file: Option<String>,
    #[serde(rename = "remoteResults")]
    pub remote_results: Option<bool>,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: Option<u64>,
    #[serde(rename = "tokenEnv")]
    pub token_env: Option<String>,
    #[serde(rename = "rawBaseUrl")]
    pub raw_base_url: Option<String>,
    #[serde(rename = "apiBaseUrl")]
    pub api_base_url: Option<String>,
    #[serde(rename = "commitMessage")]
    pub commit_message: Option<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        QuizConfig {
            owner: None,
            repo: None,
            branch: None,
            quiz_file: None,
            results_file: None,
            local_results_file: default_local_results_file(),
            remote_results: None,
            duration_seconds: None,
            token_env: None,
            raw_base_url: None,
            api_base_url: None,
            commit_message: None,
        }
    }
}

impl QuizConfig {
    pub fn owner(&self) -> QuizResult<String> {
        self.owner
            .clone()
            .filter(|s| !s.is_empty())
            .context(MissingOwnerSnafu {})
    }

    pub fn repo(&self) -> String {
        self.repo.clone().unwrap_or_else(|| DEFAULT_REPO.to_string())
    }

    pub fn branch(&self) -> String {
        self.branch
            .clone()
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }

    pub fn quiz_file(&self) -> String {
        self.quiz_file
            .clone()
            .unwrap_or_else(|| DEFAULT_QUIZ_FILE.to_string())
    }

    pub fn results_file(&self) -> String {
        self.results_file
            .clone()
            .unwrap_or_else(|| DEFAULT_RESULTS_FILE.to_string())
    }

    pub fn local_results_file(&self) -> Option<String> {
        self.local_results_file.clone().filter(|s| !s.is_empty())
    }

    pub fn remote_results(&self) -> bool {
        self.remote_results.unwrap_or(true)
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
            .unwrap_or(quiz_session::QuizRules::DEFAULT_RULES.duration_secs)
    }

    pub fn token_env(&self) -> String {
        self.token_env
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string())
    }

    /// The access credential, taken from the environment.
    pub fn token(&self) -> Option<String> {
        std::env::var(self.token_env())
            .ok()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn raw_base_url(&self) -> String {
        self.raw_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_RAW_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn commit_message(&self) -> String {
        self.commit_message
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string())
    }
}

pub fn read_config(path: &str) -> QuizResult<QuizConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

/// Reads the configuration file, if any, and applies the command line overrides.
pub fn load_config(args: &Args) -> QuizResult<QuizConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => QuizConfig::default(),
    };
    if let Some(owner) = &args.owner {
        config.owner = Some(owner.clone());
    }
    if let Some(duration) = args.duration {
        config.duration_seconds = Some(duration);
    }
    if let Some(local) = &args.local_results {
        config.local_results_file = Some(local.clone());
    }
    if args.no_remote_results {
        config.remote_results = Some(false);
    }
    // Fail early rather than after the participant filled in the form.
    config.owner()?;
    debug!("load_config: {:?}", config);
    Ok(config)
}
