//! GitHub REST and GraphQL client.

use super::graphql::{GraphQlRequest, parse_page};
use super::{BRANCH_PAGE_SIZE, BranchCandidate, ForgeApi, PullRequestPage, RetryPolicy};
use crate::config::SweepConfig;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Media type for regular REST calls.
const ACCEPT_V3: &str = "application/vnd.github.v3+json";

/// Media type for the commit and base pull request lookups.
const ACCEPT_PREVIEW: &str = "application/vnd.github.groot-preview+json";

/// Percent-encodes the characters of a branch name that would break a URL path.
///
/// Only `#` is rewritten; slashes are valid inside ref paths.
#[must_use]
pub fn encode_branch_path(name: &str) -> String {
    name.replace('#', "%23")
}

/// GitHub client for a single repository.
pub struct GithubClient {
    /// Repository slug, `owner/name`.
    repository: String,
    /// Repository name for GraphQL.
    name: String,
    /// Repository owner for GraphQL.
    owner: String,
    /// API token.
    token: SecretString,
    /// REST base URL.
    base_url: String,
    /// GraphQL endpoint.
    graphql_url: String,
    /// Retry policy for GraphQL calls.
    retry: RetryPolicy,
    /// Sleeps between GraphQL retries.
    sleeper: fn(Duration),
    /// HTTP client.
    client: Client,
}

impl GithubClient {
    /// Creates a client for a repository on `base_url`.
    #[must_use]
    pub fn new(
        repository: impl Into<String>,
        owner: impl Into<String>,
        token: SecretString,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let graphql_url = crate::config::graphql_url_for(&base_url);
        let repository = repository.into();
        Self {
            name: crate::config::repository_name(&repository).to_string(),
            repository,
            owner: owner.into(),
            token,
            base_url,
            graphql_url,
            retry: RetryPolicy::GRAPHQL,
            sleeper: std::thread::sleep,
            client: build_http_client(),
        }
    }

    /// Creates a client from a sweep configuration.
    #[must_use]
    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(
            config.repository.clone(),
            config.owner.clone(),
            config.token.clone(),
            config.base_url.clone(),
        )
        .with_graphql_url(config.graphql_url.clone())
    }

    /// Sets the GraphQL endpoint.
    #[must_use]
    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    /// Sets the GraphQL retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the function used to wait between retries.
    #[must_use]
    pub const fn with_sleeper(mut self, sleeper: fn(Duration)) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the REST URL for a path below the repository.
    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}{path}", self.base_url, self.repository)
    }

    /// Returns the URL of one branch listing page.
    #[must_use]
    pub fn branches_page_url(&self, page: u32) -> String {
        self.repo_url(&format!(
            "/branches?protected=false&per_page={BRANCH_PAGE_SIZE}&page={page}"
        ))
    }

    /// Returns the URL used to delete a branch.
    #[must_use]
    pub fn delete_branch_url(&self, name: &str) -> String {
        self.repo_url(&format!("/git/refs/heads/{}", encode_branch_path(name)))
    }

    fn authorized(&self, request: RequestBuilder, accept: &str) -> RequestBuilder {
        request
            .header("authorization", format!("Bearer {}", self.token.expose_secret()))
            .header("accept", accept)
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        debug!(url, "Sending forge request");
        request.send().map_err(|e| Error::OperationFailed {
            operation: "forge_request".to_string(),
            cause: format!("{url}: {e}"),
        })
    }

    /// Issues a GET and decodes a successful JSON body.
    fn get_json<T: DeserializeOwned>(&self, url: &str, accept: &str) -> Result<T> {
        let response = self.send(self.authorized(self.client.get(url), accept), url)?;
        decode(ensure_success(response, url)?, url)
    }

    /// Sends one GraphQL request for closed pull requests.
    fn fetch_closed_pull_requests_once(&self, after: Option<&str>) -> Result<PullRequestPage> {
        let body = GraphQlRequest::closed_pull_requests(&self.owner, &self.name, after);
        let request = self
            .client
            .post(&self.graphql_url)
            .header("authorization", format!("Bearer {}", self.token.expose_secret()))
            .json(&body);
        let response = ensure_success(self.send(request, &self.graphql_url)?, &self.graphql_url)?;
        let text = response.text().map_err(|e| Error::OperationFailed {
            operation: "read_graphql_response".to_string(),
            cause: e.to_string(),
        })?;
        parse_page(&text)
    }
}

impl ForgeApi for GithubClient {
    fn list_branches_page(&self, page: u32) -> Result<Vec<BranchCandidate>> {
        let url = self.branches_page_url(page);
        let branches: Vec<BranchPayload> = self.get_json(&url, ACCEPT_V3)?;
        Ok(branches.into_iter().map(BranchCandidate::from).collect())
    }

    fn default_branch(&self) -> Result<String> {
        let url = self.repo_url("");
        let repository: RepositoryPayload = self.get_json(&url, ACCEPT_V3)?;
        Ok(repository.default_branch)
    }

    fn branch(&self, name: &str) -> Result<Option<BranchCandidate>> {
        let url = self.repo_url(&format!("/branches/{}", encode_branch_path(name)));
        let response = self.send(self.authorized(self.client.get(&url), ACCEPT_V3), &url)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(branch = name, "Branch not found");
            return Ok(None);
        }
        let branch: BranchPayload = decode(ensure_success(response, &url)?, &url)?;
        Ok(Some(branch.into()))
    }

    fn has_open_pull_request(&self, commit_sha: &str) -> Result<bool> {
        let url = self.repo_url(&format!("/commits/{commit_sha}/pulls"));
        let pulls: Vec<PullPayload> = self.get_json(&url, ACCEPT_PREVIEW)?;
        Ok(pulls.iter().any(|pull| pull.state == "open"))
    }

    fn is_pull_request_base(&self, branch: &str) -> Result<bool> {
        let url = self.repo_url("/pulls");
        let request = self
            .client
            .get(&url)
            .query(&[("base", branch), ("state", "all")]);
        let response = self.send(self.authorized(request, ACCEPT_PREVIEW), &url)?;
        let pulls: Vec<serde_json::Value> = decode(ensure_success(response, &url)?, &url)?;
        Ok(!pulls.is_empty())
    }

    fn commit_date(&self, commit_url: &str) -> Result<Option<DateTime<Utc>>> {
        let payload: CommitPayload = self.get_json(commit_url, ACCEPT_V3)?;
        let raw = payload.commit.date();
        let date = raw.and_then(|raw| match DateTime::parse_from_rfc3339(raw) {
            Ok(date) => Some(date.with_timezone(&Utc)),
            Err(e) => {
                warn!(commit_url, date = raw, error = %e, "Unparseable commit date");
                None
            },
        });
        if date.is_none() {
            warn!(
                commit_url,
                "Could not determine commit date, assuming it is not old enough to delete"
            );
        }
        Ok(date)
    }

    fn closed_pull_requests(&self, after: Option<&str>) -> Option<PullRequestPage> {
        self.retry.run("graphql_closed_pull_requests", self.sleeper, |_| {
            self.fetch_closed_pull_requests_once(after)
        })
    }

    fn delete_branch(&self, name: &str) -> Result<bool> {
        let url = self.delete_branch_url(name);
        let response = self.send(self.authorized(self.client.delete(&url), ACCEPT_V3), &url)?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(true);
        }
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        warn!(branch = name, url = %url, status, body = %body, "Failed to delete branch");
        Ok(false)
    }

    fn graphql_attempts(&self) -> u32 {
        self.retry.max_attempts
    }
}

/// Builds the blocking HTTP client with the crate's user agent.
fn build_http_client() -> Client {
    Client::builder()
        .user_agent(format!("branchsweep/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|err| {
            warn!("Failed to build HTTP client: {err}");
            Client::new()
        })
}

/// Converts a non-success response into a transport error.
fn ensure_success(response: Response, url: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Err(Error::Transport {
        url: url.to_string(),
        status,
        body,
    })
}

fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    response.json().map_err(|e| Error::OperationFailed {
        operation: "decode_forge_response".to_string(),
        cause: format!("{url}: {e}"),
    })
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    name: String,
    #[serde(default)]
    protected: bool,
    commit: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
    url: String,
}

impl From<BranchPayload> for BranchCandidate {
    fn from(payload: BranchPayload) -> Self {
        Self {
            name: payload.name,
            commit_sha: payload.commit.sha,
            commit_url: payload.commit.url,
            protected: payload.protected,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PullPayload {
    state: String,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    #[serde(default)]
    commit: CommitDetail,
}

#[derive(Debug, Default, Deserialize)]
struct CommitDetail {
    committer: Option<Signature>,
    author: Option<Signature>,
}

impl CommitDetail {
    /// Committer date, or author date when the committer has none.
    fn date(&self) -> Option<&str> {
        fn date_of(signature: &Option<Signature>) -> Option<&str> {
            signature.as_ref().and_then(|s| s.date.as_deref())
        }
        date_of(&self.committer).or_else(|| date_of(&self.author))
    }
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: Option<String>,
}
