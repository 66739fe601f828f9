//! Branch filter pipeline.
//!
//! A branch is deletable only if it passes, in order:
//!
//! 1. not the default branch
//! 2. not protected
//! 3. no ignored prefix
//! 4. an allowed prefix, when any are configured
//! 5. no open pull request on its latest commit
//! 6. not the base of a pull request
//! 7. latest commit at least `last_commit_age_days` old
//!
//! Steps 1-4 and 7 are pure; 5 and 6 ask the forge. A failed step yields a
//! [`Rejection`] describing why, which is reported but never raised.

use crate::config::SweepConfig;
use crate::forge::{BranchCandidate, ForgeApi};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

/// Reason a candidate was not selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The candidate is the repository's default branch.
    DefaultBranch,
    /// The forge marks the branch protected.
    Protected,
    /// The name starts with an ignored prefix.
    IgnoredPrefix(String),
    /// Allowed prefixes are configured and none matches.
    NoAllowedPrefix,
    /// A pull request referencing the latest commit is open.
    OpenPullRequest,
    /// Another pull request targets this branch.
    PullRequestBase,
    /// The latest commit is newer than the threshold.
    CommitTooRecent {
        /// Age of the commit in whole days.
        age_days: i64,
        /// Configured threshold in days.
        threshold_days: u32,
    },
    /// The latest commit has no usable date.
    UnknownCommitDate,
    /// The pull request was updated more recently than the threshold.
    PullRequestTooRecent {
        /// Days since the last update.
        age_days: i64,
        /// Configured threshold in days.
        threshold_days: u32,
    },
    /// The pull request's head branch no longer exists.
    HeadBranchDeleted,
    /// The branch disappeared between listing and lookup.
    BranchNotFound,
}

impl Rejection {
    /// Returns a short machine-friendly label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::DefaultBranch => "default_branch",
            Self::Protected => "protected",
            Self::IgnoredPrefix(_) => "ignored_prefix",
            Self::NoAllowedPrefix => "no_allowed_prefix",
            Self::OpenPullRequest => "open_pull_request",
            Self::PullRequestBase => "pull_request_base",
            Self::CommitTooRecent { .. } => "commit_too_recent",
            Self::UnknownCommitDate => "unknown_commit_date",
            Self::PullRequestTooRecent { .. } => "pull_request_too_recent",
            Self::HeadBranchDeleted => "head_branch_deleted",
            Self::BranchNotFound => "branch_not_found",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultBranch => f.write_str("it is the default branch"),
            Self::Protected => f.write_str("it is protected"),
            Self::IgnoredPrefix(prefix) => {
                write!(f, "it matches the ignored branch prefix `{prefix}`")
            },
            Self::NoAllowedPrefix => {
                f.write_str("it does not match any of the allowed prefixes")
            },
            Self::OpenPullRequest => f.write_str("it has open pull requests"),
            Self::PullRequestBase => {
                f.write_str("it is the base for a pull request of another branch")
            },
            Self::CommitTooRecent {
                age_days,
                threshold_days,
            } => write!(
                f,
                "its last commit is {age_days} days old, newer than {threshold_days} days"
            ),
            Self::UnknownCommitDate => {
                f.write_str("the date of its last commit could not be determined")
            },
            Self::PullRequestTooRecent {
                age_days,
                threshold_days,
            } => write!(
                f,
                "its pull request was updated {age_days} days ago, newer than {threshold_days} days"
            ),
            Self::HeadBranchDeleted => f.write_str("its head branch is already deleted"),
            Self::BranchNotFound => f.write_str("the branch no longer exists"),
        }
    }
}

/// Outcome of one filter step.
pub type Verdict = std::result::Result<(), Rejection>;

/// Returns the number of whole days between `then` and `now`.
///
/// Timestamps in the future give a negative age.
#[must_use]
pub fn age_in_days(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_days()
}

/// The filter pipeline for one run.
#[derive(Debug, Clone)]
pub struct FilterPipeline<'a> {
    default_branch: &'a str,
    ignore_prefixes: &'a BTreeSet<String>,
    allowed_prefixes: &'a BTreeSet<String>,
    threshold_days: u32,
    now: DateTime<Utc>,
}

impl<'a> FilterPipeline<'a> {
    /// Creates a pipeline for the given default branch and configuration.
    #[must_use]
    pub const fn new(default_branch: &'a str, config: &'a SweepConfig, now: DateTime<Utc>) -> Self {
        Self {
            default_branch,
            ignore_prefixes: &config.ignore_prefixes,
            allowed_prefixes: &config.allowed_prefixes,
            threshold_days: config.last_commit_age_days,
            now,
        }
    }

    /// Rejects the default branch.
    pub fn check_default(&self, name: &str) -> Verdict {
        if name == self.default_branch {
            return Err(Rejection::DefaultBranch);
        }
        Ok(())
    }

    /// Rejects protected branches.
    pub const fn check_protected(protected: bool) -> Verdict {
        if protected {
            return Err(Rejection::Protected);
        }
        Ok(())
    }

    /// Rejects names starting with an ignored prefix.
    pub fn check_ignored(&self, name: &str) -> Verdict {
        match self
            .ignore_prefixes
            .iter()
            .find(|prefix| name.starts_with(prefix.as_str()))
        {
            Some(prefix) => Err(Rejection::IgnoredPrefix(prefix.clone())),
            None => Ok(()),
        }
    }

    /// Rejects names without an allowed prefix, when any are configured.
    pub fn check_allowed(&self, name: &str) -> Verdict {
        if self.allowed_prefixes.is_empty()
            || self
                .allowed_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
        {
            return Ok(());
        }
        Err(Rejection::NoAllowedPrefix)
    }

    /// Name-only checks: default branch, ignored prefix, allowed prefix.
    pub fn screen_name(&self, name: &str) -> Verdict {
        self.check_default(name)?;
        self.check_ignored(name)?;
        self.check_allowed(name)
    }

    /// Checks that need no forge call: default, protected, ignored, allowed.
    pub fn screen_branch(&self, branch: &BranchCandidate) -> Verdict {
        self.check_default(&branch.name)?;
        Self::check_protected(branch.protected)?;
        self.check_ignored(&branch.name)?;
        self.check_allowed(&branch.name)
    }

    /// Requires the last commit to be at least the threshold old.
    ///
    /// An unknown date is never old enough.
    pub fn check_commit_age(&self, committed_at: Option<DateTime<Utc>>) -> Verdict {
        let committed_at = committed_at.ok_or(Rejection::UnknownCommitDate)?;
        let age_days = age_in_days(committed_at, self.now);
        if age_days >= i64::from(self.threshold_days) {
            return Ok(());
        }
        Err(Rejection::CommitTooRecent {
            age_days,
            threshold_days: self.threshold_days,
        })
    }

    /// Requires a pull request's last update to be at least the threshold old.
    pub fn check_pull_request_age(&self, updated_at: DateTime<Utc>) -> Verdict {
        let age_days = age_in_days(updated_at, self.now);
        if age_days >= i64::from(self.threshold_days) {
            return Ok(());
        }
        Err(Rejection::PullRequestTooRecent {
            age_days,
            threshold_days: self.threshold_days,
        })
    }

    /// Checks that ask the forge: open pull request, pull request base, commit age.
    ///
    /// Calls stop at the first rejection.
    pub fn check_remote<F: ForgeApi + ?Sized>(
        &self,
        forge: &F,
        branch: &BranchCandidate,
    ) -> Result<Verdict> {
        if forge.has_open_pull_request(&branch.commit_sha)? {
            return Ok(Err(Rejection::OpenPullRequest));
        }
        if forge.is_pull_request_base(&branch.name)? {
            return Ok(Err(Rejection::PullRequestBase));
        }
        let committed_at = forge.commit_date(&branch.commit_url)?;
        Ok(self.check_commit_age(committed_at))
    }

    /// Runs the full pipeline on a listed branch.
    pub fn evaluate<F: ForgeApi + ?Sized>(
        &self,
        forge: &F,
        branch: &BranchCandidate,
    ) -> Result<Verdict> {
        if let Err(rejection) = self.screen_branch(branch) {
            return Ok(Err(rejection));
        }
        self.check_remote(forge, branch)
    }
}
