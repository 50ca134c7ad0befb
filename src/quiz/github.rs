// Access to the files of a GitHub repository: raw downloads and the content API.

use chrono::Utc;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::quiz::config_reader::QuizConfig;
use crate::quiz::*;

/// The status and body of an HTTP response.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// The JSON document returned by a GET on the content API.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ContentsFile {
    pub content: String,
    pub sha: String,
}

/// The JSON document sent with a PUT on the content API.
///
/// `sha` must be the value returned by the last GET when the file exists, and
/// be absent when the file is created.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PutContents {
    pub message: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// A remote repository of files.
///
/// Implementations only report what the server answered: the callers decide
/// which statuses are acceptable.
pub trait ContentHost {
    /// Downloads the raw content of a file, bypassing caches.
    fn get_raw(&self, path: &str) -> QuizResult<HttpReply>;

    /// Reads a file through the content API.
    fn get_contents(&self, path: &str) -> QuizResult<HttpReply>;

    /// Creates or replaces a file through the content API.
    fn put_contents(&self, path: &str, body: &PutContents) -> QuizResult<HttpReply>;
}

pub struct GithubClient {
    client: Client,
    raw_base: String,
    api_base: String,
    branch: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &QuizConfig, token: Option<String>) -> QuizResult<GithubClient> {
        let owner_repo = format!("{}/{}", config.owner()?, config.repo());
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(HttpSnafu {
                url: config.api_base_url(),
            })?;
        Ok(GithubClient {
            client,
            raw_base: format!("{}/{}", config.raw_base_url(), owner_repo),
            api_base: format!("{}/repos/{}/contents", config.api_base_url(), owner_repo),
            branch: config.branch(),
            token,
        })
    }

    fn raw_url(&self, path: &str) -> String {
        // The timestamp defeats intermediate caches.
        format!(
            "{}/{}/{}?timestamp={}",
            self.raw_base,
            self.branch,
            path,
            Utc::now().timestamp_millis()
        )
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header(ACCEPT, "application/vnd.github.v3+json");
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("token {}", token)),
            None => req,
        }
    }

    fn send(req: RequestBuilder, url: &str) -> QuizResult<HttpReply> {
        let resp = req.send().context(HttpSnafu { url })?;
        let status = resp.status().as_u16();
        let body = resp.bytes().context(HttpSnafu { url })?.to_vec();
        debug!("send: {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpReply { status, body })
    }
}

impl ContentHost for GithubClient {
    fn get_raw(&self, path: &str) -> QuizResult<HttpReply> {
        let url = self.raw_url(path);
        let req = self.client.get(&url).header(CACHE_CONTROL, "no-cache");
        GithubClient::send(req, &url)
    }

    fn get_contents(&self, path: &str) -> QuizResult<HttpReply> {
        let url = self.contents_url(path);
        let req = self.with_auth(self.client.get(&url));
        GithubClient::send(req, &url)
    }

    fn put_contents(&self, path: &str, body: &PutContents) -> QuizResult<HttpReply> {
        let url = self.contents_url(path);
        let req = self.with_auth(self.client.put(&url)).json(body);
        GithubClient::send(req, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GithubClient {
        let config: QuizConfig = serde_json::from_str(
            r#"{"owner": "acme", "repo": "quiz", "branch": "dev", "rawBaseUrl": "https://raw.example.com/"}"#,
        )
        .unwrap();
        GithubClient::new(&config, Some("secret".to_string())).unwrap()
    }

    #[test]
    fn urls() {
        let c = client();
        assert_eq!(
            c.contents_url("results.xlsx"),
            "https://api.github.com/repos/acme/quiz/contents/results.xlsx"
        );
        let raw = c.raw_url("quiz_data.xlsx");
        assert!(raw.starts_with("https://raw.example.com/acme/quiz/dev/quiz_data.xlsx?timestamp="));
    }

    #[test]
    fn sha_omitted_on_creation() {
        let body = PutContents {
            message: "m".to_string(),
            content: "AAAA".to_string(),
            sha: None,
        };
        let js = serde_json::to_value(&body).unwrap();
        assert!(js.get("sha").is_none());
        let body = PutContents {
            sha: Some("abc".to_string()),
            ..body
        };
        let js = serde_json::to_value(&body).unwrap();
        assert_eq!(js["sha"], "abc");
    }
}
