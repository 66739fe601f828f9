//! Configuration management.
//!
//! A run is described by one immutable [`SweepConfig`]. Values come from, in
//! increasing precedence: built-in defaults, an optional TOML file, then CLI
//! flags and environment variables (see [`crate::cli`]).

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Default REST API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default minimum age, in days, of a branch's last commit.
pub const DEFAULT_LAST_COMMIT_AGE_DAYS: u32 = 60;

/// Default maximum number of branches selected per run.
pub const DEFAULT_BRANCH_LIMIT: usize = 100;

/// How candidate branches are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Scan every unprotected branch of the repository.
    #[default]
    AllBranches,
    /// Scan the head branches of closed pull requests.
    ClosedPullRequests,
}

impl Strategy {
    /// Selects the strategy from the `only closed PRs` switch.
    #[must_use]
    pub const fn from_only_closed_prs(only_closed_prs: bool) -> Self {
        if only_closed_prs {
            Self::ClosedPullRequests
        } else {
            Self::AllBranches
        }
    }

    /// Returns the strategy name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllBranches => "all_branches",
            Self::ClosedPullRequests => "closed_pull_requests",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single sweep of one repository.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Repository slug, `owner/name`.
    pub repository: String,
    /// Repository owner, used by the GraphQL query.
    pub owner: String,
    /// Token used for every forge call.
    pub token: SecretString,
    /// REST API base URL, without a trailing slash.
    pub base_url: String,
    /// GraphQL endpoint URL.
    pub graphql_url: String,
    /// Minimum age in days of the last commit (and of the pull request update).
    pub last_commit_age_days: u32,
    /// Branches starting with any of these prefixes are never deleted.
    pub ignore_prefixes: BTreeSet<String>,
    /// If non-empty, only branches starting with one of these are deleted.
    pub allowed_prefixes: BTreeSet<String>,
    /// Maximum number of branches selected.
    pub branch_limit: usize,
    /// Whether deletion is skipped.
    pub dry_run: bool,
    /// Discovery strategy.
    pub strategy: Strategy,
}

impl SweepConfig {
    /// Creates a configuration with default settings for a repository.
    ///
    /// The owner is taken from the repository slug and the GraphQL URL is
    /// derived from the default base URL. Runs are dry by default.
    #[must_use]
    pub fn new(repository: impl Into<String>, token: impl Into<String>) -> Self {
        let repository = repository.into();
        let owner = repository
            .split_once('/')
            .map(|(owner, _)| owner.to_string())
            .unwrap_or_default();
        Self {
            repository,
            owner,
            token: SecretString::from(token.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            graphql_url: graphql_url_for(DEFAULT_BASE_URL),
            last_commit_age_days: DEFAULT_LAST_COMMIT_AGE_DAYS,
            ignore_prefixes: BTreeSet::new(),
            allowed_prefixes: BTreeSet::new(),
            branch_limit: DEFAULT_BRANCH_LIMIT,
            dry_run: true,
            strategy: Strategy::AllBranches,
        }
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Sets the REST base URL and re-derives the GraphQL URL from it.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.graphql_url = graphql_url_for(&self.base_url);
        self
    }

    /// Overrides the GraphQL URL.
    #[must_use]
    pub fn with_graphql_url(mut self, graphql_url: impl Into<String>) -> Self {
        self.graphql_url = graphql_url.into();
        self
    }

    /// Sets the minimum age in days.
    #[must_use]
    pub const fn with_last_commit_age_days(mut self, days: u32) -> Self {
        self.last_commit_age_days = days;
        self
    }

    /// Sets the ignored prefixes.
    #[must_use]
    pub fn with_ignore_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_prefixes = prefix_set(prefixes);
        self
    }

    /// Sets the allowed prefixes.
    #[must_use]
    pub fn with_allowed_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_prefixes = prefix_set(prefixes);
        self
    }

    /// Sets the maximum number of selected branches.
    #[must_use]
    pub const fn with_branch_limit(mut self, limit: usize) -> Self {
        self.branch_limit = limit;
        self
    }

    /// Sets the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the discovery strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Checks that the configuration can drive a run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a malformed slug, an empty owner or
    /// token, or an unparseable URL.
    pub fn validate(&self) -> Result<()> {
        let valid_slug = self
            .repository
            .split_once('/')
            .is_some_and(|(owner, name)| {
                !owner.is_empty() && !name.is_empty() && !name.contains('/')
            });
        if !valid_slug {
            return Err(Error::InvalidInput(format!(
                "repository must look like 'owner/name', got '{}'",
                self.repository
            )));
        }
        if self.owner.trim().is_empty() {
            return Err(Error::InvalidInput("repository owner is empty".to_string()));
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(Error::InvalidInput("GitHub token is empty".to_string()));
        }
        for (label, url) in [("base URL", &self.base_url), ("GraphQL URL", &self.graphql_url)] {
            reqwest::Url::parse(url)
                .map_err(|e| Error::InvalidInput(format!("invalid {label} '{url}': {e}")))?;
        }
        Ok(())
    }
}

/// Configuration file structure (for TOML parsing).
///
/// Has no token field. The token only comes from the CLI or environment.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Repository slug.
    pub repository: Option<String>,
    /// Repository owner.
    pub owner: Option<String>,
    /// REST API base URL.
    pub base_url: Option<String>,
    /// GraphQL endpoint URL.
    pub graphql_url: Option<String>,
    /// Minimum age in days.
    pub last_commit_age_days: Option<u32>,
    /// Ignored branch prefixes.
    pub ignore_branches: Option<Vec<String>>,
    /// Allowed branch prefixes.
    pub allowed_prefixes: Option<Vec<String>>,
    /// Maximum number of selected branches.
    pub branch_limit: Option<usize>,
    /// Dry-run flag.
    pub dry_run: Option<bool>,
    /// Whether only closed pull requests are scanned.
    pub only_closed_prs: Option<bool>,
}

impl ConfigFile {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::parse(&contents)
    }

    /// Parses configuration file contents.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })
    }
}

/// Derives the GraphQL endpoint from a REST base URL.
///
/// `https://api.github.com` maps to `https://api.github.com/graphql`;
/// GitHub Enterprise's `https://host/api/v3` maps to `https://host/api/graphql`.
#[must_use]
pub fn graphql_url_for(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    base.strip_suffix("/api/v3").map_or_else(
        || format!("{base}/graphql"),
        |host| format!("{host}/api/graphql"),
    )
}

/// Returns the name part of an `owner/name` slug.
#[must_use]
pub fn repository_name(slug: &str) -> &str {
    slug.rsplit_once('/').map_or(slug, |(_, name)| name)
}

/// Splits a comma-separated prefix list, trimming entries and dropping empty ones.
#[must_use]
pub fn parse_prefix_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|prefix| !prefix.is_empty())
        .map(String::from)
        .collect()
}

fn prefix_set<I, S>(prefixes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    prefixes
        .into_iter()
        .map(Into::into)
        .filter(|prefix| !prefix.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_new_defaults() {
        let config = SweepConfig::new("octo/widgets", "t0ken");

        assert_eq!(config.owner, "octo");
        assert_eq!(repository_name(&config.repository), "widgets");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.graphql_url, "https://api.github.com/graphql");
        assert_eq!(config.last_commit_age_days, 60);
        assert_eq!(config.branch_limit, 100);
        assert!(config.dry_run);
        assert_eq!(config.strategy, Strategy::AllBranches);
        assert!(config.validate().is_ok());
    }

    #[test_case("https://api.github.com", "https://api.github.com/graphql" ; "github.com")]
    #[test_case("https://api.github.com/", "https://api.github.com/graphql" ; "trailing slash")]
    #[test_case("https://ghe.example.com/api/v3", "https://ghe.example.com/api/graphql" ; "enterprise")]
    #[test_case("http://localhost:8080", "http://localhost:8080/graphql" ; "local")]
    fn test_graphql_url_for(base: &str, expected: &str) {
        assert_eq!(graphql_url_for(base), expected);
    }

    #[test]
    fn test_with_base_url_rederives_graphql() {
        let config = SweepConfig::new("octo/widgets", "t").with_base_url("https://ghe.corp/api/v3/");
        assert_eq!(config.base_url, "https://ghe.corp/api/v3");
        assert_eq!(config.graphql_url, "https://ghe.corp/api/graphql");
    }

    #[test_case("", &[] ; "empty")]
    #[test_case("release/", &["release/"] ; "single")]
    #[test_case("a, b ,,c", &["a", "b", "c"] ; "trims and drops empties")]
    fn test_parse_prefix_list(raw: &str, expected: &[&str]) {
        assert_eq!(parse_prefix_list(raw), expected);
    }

    #[test_case("widgets" ; "missing owner")]
    #[test_case("/widgets" ; "empty owner")]
    #[test_case("octo/" ; "empty name")]
    #[test_case("a/b/c" ; "too many segments")]
    fn test_validate_rejects_bad_slug(repository: &str) {
        let config = SweepConfig::new(repository, "t").with_owner("octo");
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_empty_token() {
        let config = SweepConfig::new("octo/widgets", "  ");
        let err = config.validate().expect_err("empty token");
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = SweepConfig::new("octo/widgets", "t").with_graphql_url("not a url");
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_prefix_sets_drop_empty_entries() {
        let config = SweepConfig::new("octo/widgets", "t")
            .with_ignore_prefixes(["", "wip/", "wip/"])
            .with_allowed_prefixes(Vec::<String>::new());

        assert_eq!(config.ignore_prefixes.len(), 1);
        assert!(config.allowed_prefixes.is_empty());
    }

    #[test]
    fn test_config_file_parse() {
        let file = ConfigFile::parse(
            r#"
            repository = "octo/widgets"
            last_commit_age_days = 30
            ignore_branches = ["release/"]
            dry_run = false
            only_closed_prs = true
            "#,
        )
        .expect("valid config");

        assert_eq!(file.repository.as_deref(), Some("octo/widgets"));
        assert_eq!(file.last_commit_age_days, Some(30));
        assert_eq!(file.ignore_branches, Some(vec!["release/".to_string()]));
        assert_eq!(file.dry_run, Some(false));
        assert_eq!(file.only_closed_prs, Some(true));
        assert!(file.branch_limit.is_none());
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        let err = ConfigFile::parse("token = \"nope\"").expect_err("token is not a file key");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_config_file_load_missing() {
        let err = ConfigFile::load(Path::new("/definitely/not/here.toml")).expect_err("missing");
        assert!(err.to_string().contains("read_config_file"));
    }

    #[test]
    fn test_strategy_from_switch() {
        assert_eq!(Strategy::from_only_closed_prs(true), Strategy::ClosedPullRequests);
        assert_eq!(Strategy::from_only_closed_prs(false), Strategy::AllBranches);
        assert_eq!(Strategy::ClosedPullRequests.to_string(), "closed_pull_requests");
    }
}
