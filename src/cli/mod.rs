//! Command-line interface.
//!
//! Flags mirror the inputs of the CI action that drives the tool. Every flag
//! can also come from the environment, and all non-secret settings can come
//! from a TOML file passed with `--config`.
//!
//! # Example Usage
//!
//! ```bash
//! # Preview what would be deleted
//! branchsweep --github-token "$TOKEN" --github-repository octo/widgets
//!
//! # Delete merged feature branches older than 30 days
//! branchsweep --github-token "$TOKEN" --github-repository octo/widgets \
//!     --allowed-prefixes feature/ --last-commit-age-days 30 --dry-run no
//! ```

use crate::Result;
use crate::config::{
    ConfigFile, DEFAULT_BASE_URL, DEFAULT_BRANCH_LIMIT, DEFAULT_LAST_COMMIT_AGE_DAYS, Strategy,
    SweepConfig, parse_prefix_list,
};
use crate::observability::{InitOptions, LogFormat};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// A `yes`/`no` switch, as CI action inputs are strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    /// Enabled.
    Yes,
    /// Disabled.
    No,
}

impl YesNo {
    /// Returns the switch as a bool.
    #[must_use]
    pub const fn as_bool(self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// Branchsweep - delete stale branches from a GitHub repository.
#[derive(Debug, Parser)]
#[command(name = "branchsweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Token used to call the GitHub API.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Repository to sweep, as `owner/name`.
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repository: Option<String>,

    /// Repository owner (defaults to the owner part of the repository).
    #[arg(long, env = "GITHUB_REPOSITORY_OWNER")]
    pub github_owner: Option<String>,

    /// The API base URL, for GitHub Enterprise.
    #[arg(long)]
    pub github_base_url: Option<String>,

    /// The GraphQL endpoint (derived from the base URL by default).
    #[arg(long)]
    pub github_graphql_url: Option<String>,

    /// Comma-separated list of branch prefixes to ignore.
    #[arg(long)]
    pub ignore_branches: Option<String>,

    /// Comma-separated list of prefixes a branch must match to be deleted.
    #[arg(long)]
    pub allowed_prefixes: Option<String>,

    /// How old in days the last commit of a branch must be for it to be deleted.
    #[arg(long)]
    pub last_commit_age_days: Option<u32>,

    /// The max number of branches that can be deleted.
    #[arg(long)]
    pub branch_limit: Option<usize>,

    /// Whether to skip deleting branches (default: yes).
    #[arg(long, value_enum)]
    pub dry_run: Option<YesNo>,

    /// Whether only branches of closed pull requests are considered (default: no).
    #[arg(long, value_enum)]
    pub only_closed_prs: Option<YesNo>,

    /// Path to a TOML configuration file.
    #[arg(short, long, env = "BRANCHSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Logging options requested on the command line.
    #[must_use]
    pub const fn init_options(&self) -> InitOptions {
        InitOptions {
            verbose: self.verbose,
            format: self.log_format,
        }
    }

    /// Resolves the sweep configuration, reading `--config` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn into_config(self) -> Result<SweepConfig> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        self.resolve(file)
    }

    /// Merges flags over a configuration file over defaults, then validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged configuration is invalid.
    pub fn resolve(self, file: ConfigFile) -> Result<SweepConfig> {
        let repository = self
            .github_repository
            .or(file.repository)
            .unwrap_or_default();
        let base_url = self
            .github_base_url
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let ignore_prefixes = self
            .ignore_branches
            .as_deref()
            .map(parse_prefix_list)
            .or(file.ignore_branches)
            .unwrap_or_default();
        let allowed_prefixes = self
            .allowed_prefixes
            .as_deref()
            .map(parse_prefix_list)
            .or(file.allowed_prefixes)
            .unwrap_or_default();
        let dry_run = self
            .dry_run
            .map(YesNo::as_bool)
            .or(file.dry_run)
            .unwrap_or(true);
        let only_closed_prs = self
            .only_closed_prs
            .map(YesNo::as_bool)
            .or(file.only_closed_prs)
            .unwrap_or(false);

        let mut config = SweepConfig::new(repository, self.github_token)
            .with_base_url(base_url)
            .with_ignore_prefixes(ignore_prefixes)
            .with_allowed_prefixes(allowed_prefixes)
            .with_last_commit_age_days(
                self.last_commit_age_days
                    .or(file.last_commit_age_days)
                    .unwrap_or(DEFAULT_LAST_COMMIT_AGE_DAYS),
            )
            .with_branch_limit(
                self.branch_limit
                    .or(file.branch_limit)
                    .unwrap_or(DEFAULT_BRANCH_LIMIT),
            )
            .with_dry_run(dry_run)
            .with_strategy(Strategy::from_only_closed_prs(only_closed_prs));

        if let Some(owner) = self
            .github_owner
            .or(file.owner)
            .filter(|owner| !owner.trim().is_empty())
        {
            config = config.with_owner(owner);
        }
        if let Some(graphql_url) = self.github_graphql_url.or(file.graphql_url) {
            config = config.with_graphql_url(graphql_url);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec![
            "branchsweep",
            "--github-token",
            "t0ken",
            "--github-repository",
            "octo/widgets",
            "--github-owner",
            "octo",
        ];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[])
            .resolve(ConfigFile::default())
            .expect("valid config");

        assert_eq!(config.repository, "octo/widgets");
        assert_eq!(config.owner, "octo");
        assert_eq!(config.token.expose_secret(), "t0ken");
        assert_eq!(config.base_url, "https://api.github.com");
        assert_eq!(config.last_commit_age_days, 60);
        assert_eq!(config.branch_limit, 100);
        assert!(config.dry_run);
        assert_eq!(config.strategy, Strategy::AllBranches);
        assert!(config.ignore_prefixes.is_empty());
        assert!(config.allowed_prefixes.is_empty());
    }

    #[test]
    fn test_all_flags() {
        let config = parse(&[
            "--ignore-branches",
            "release/,keep-",
            "--allowed-prefixes",
            "feature/",
            "--last-commit-age-days",
            "30",
            "--branch-limit",
            "5",
            "--dry-run",
            "no",
            "--only-closed-prs",
            "yes",
            "--github-base-url",
            "https://ghe.corp/api/v3",
        ])
        .resolve(ConfigFile::default())
        .expect("valid config");

        assert_eq!(config.ignore_prefixes.len(), 2);
        assert!(config.ignore_prefixes.contains("keep-"));
        assert!(config.allowed_prefixes.contains("feature/"));
        assert_eq!(config.last_commit_age_days, 30);
        assert_eq!(config.branch_limit, 5);
        assert!(!config.dry_run);
        assert_eq!(config.strategy, Strategy::ClosedPullRequests);
        assert_eq!(config.graphql_url, "https://ghe.corp/api/graphql");
    }

    #[test]
    fn test_rejects_unknown_switch_value() {
        let result = Cli::try_parse_from([
            "branchsweep",
            "--github-token",
            "t",
            "--dry-run",
            "true",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let file = ConfigFile::parse(
            r#"
            last_commit_age_days = 10
            branch_limit = 3
            ignore_branches = ["wip/"]
            dry_run = false
            "#,
        )
        .expect("valid file");

        let config = parse(&["--branch-limit", "7"])
            .resolve(file)
            .expect("valid config");

        assert_eq!(config.branch_limit, 7);
        assert_eq!(config.last_commit_age_days, 10);
        assert!(config.ignore_prefixes.contains("wip/"));
        assert!(!config.dry_run);
    }

    #[test]
    fn test_owner_defaults_to_repository_owner() {
        let cli = Cli::try_parse_from([
            "branchsweep",
            "--github-token",
            "t",
            "--github-repository",
            "acme/rockets",
            "--github-owner",
            "",
        ])
        .expect("valid arguments");

        let config = cli.resolve(ConfigFile::default()).expect("valid config");
        assert_eq!(config.owner, "acme");
    }

    #[test]
    fn test_invalid_repository_is_rejected() {
        let cli = Cli::try_parse_from([
            "branchsweep",
            "--github-token",
            "t",
            "--github-repository",
            "just-a-name",
        ])
        .expect("valid arguments");

        assert!(matches!(
            cli.resolve(ConfigFile::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_init_options() {
        let cli = parse(&["--verbose", "--log-format", "json"]);
        let options = cli.init_options();

        assert!(options.verbose);
        assert_eq!(options.format, LogFormat::Json);
    }
}
