//! Forge client abstraction.
//!
//! The sweep logic talks to the forge only through [`ForgeApi`]. The
//! production implementation is [`GithubClient`], which speaks the GitHub
//! REST and GraphQL APIs over a blocking `reqwest` client.

mod github;
mod graphql;
mod pagination;
mod retry;

pub use github::{GithubClient, encode_branch_path};
pub use graphql::{CLOSED_PULL_REQUESTS_QUERY, PULL_REQUEST_PAGE_SIZE};
pub use pagination::{BranchPages, ClosedPullRequestPages, PageSource};
pub use retry::RetryPolicy;

use crate::Result;
use chrono::{DateTime, Utc};

/// Number of branches requested per REST page.
pub const BRANCH_PAGE_SIZE: u32 = 30;

/// A branch as reported by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCandidate {
    /// Branch name.
    pub name: String,
    /// Hash of the latest commit.
    pub commit_sha: String,
    /// API URL of the latest commit.
    pub commit_url: String,
    /// Whether the forge marks the branch protected.
    pub protected: bool,
}

/// A closed pull request from the GraphQL listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    /// Pull request title.
    pub title: String,
    /// Pull request web URL.
    pub url: String,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Name of the head branch, kept even after the branch is deleted.
    pub head_ref_name: String,
    /// Name of the live head ref; `None` once the branch has been deleted.
    pub head_ref: Option<String>,
}

impl PullRequestRecord {
    /// Returns `true` if the head branch still exists.
    #[must_use]
    pub const fn head_branch_exists(&self) -> bool {
        self.head_ref.is_some()
    }
}

/// One page of closed pull requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestPage {
    /// Pull requests on this page, most recently updated first.
    pub records: Vec<PullRequestRecord>,
    /// Cursor to pass to fetch the following page.
    pub end_cursor: Option<String>,
    /// Whether another page exists.
    pub has_next_page: bool,
}

/// Operations the sweep needs from a Git forge.
///
/// Implementations are called sequentially from a single thread.
pub trait ForgeApi {
    /// Lists one page of unprotected branches.
    ///
    /// An empty page means the listing is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on any non-success status.
    fn list_branches_page(&self, page: u32) -> Result<Vec<BranchCandidate>>;

    /// Returns the repository's default branch name.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository metadata cannot be retrieved.
    fn default_branch(&self) -> Result<String>;

    /// Looks up a single branch, returning `None` if the forge reports 404.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on any other non-success status.
    fn branch(&self, name: &str) -> Result<Option<BranchCandidate>>;

    /// Returns `true` if an open pull request references the commit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on any non-success status.
    fn has_open_pull_request(&self, commit_sha: &str) -> Result<bool>;

    /// Returns `true` if any pull request, open or closed, uses the branch as its base.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on any non-success status.
    fn is_pull_request_base(&self, branch: &str) -> Result<bool>;

    /// Resolves a commit's committer date, falling back to its author date.
    ///
    /// Returns `None` when neither date is available.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] on any non-success status.
    fn commit_date(&self, commit_url: &str) -> Result<Option<DateTime<Utc>>>;

    /// Fetches one page of closed pull requests after the given cursor.
    ///
    /// Returns `None` when every retry attempt failed.
    fn closed_pull_requests(&self, after: Option<&str>) -> Option<PullRequestPage>;

    /// Deletes a branch, returning `false` if the forge did not confirm it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be sent.
    fn delete_branch(&self, name: &str) -> Result<bool>;

    /// Number of attempts made before [`ForgeApi::closed_pull_requests`] gives up.
    fn graphql_attempts(&self) -> u32 {
        RetryPolicy::GRAPHQL.max_attempts
    }
}
