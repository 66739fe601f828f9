//! Shared fixtures for integration tests.
//!
//! [`FakeForge`] is an in-memory forge that records every call it receives.

#![allow(dead_code)]

use branchsweep::{
    BranchCandidate, Error, ForgeApi, PullRequestPage, PullRequestRecord, Result, SweepConfig,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

/// Fixed "now" used by every scenario.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// A timestamp `days` whole days before [`now`].
pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

/// A configuration for `octo/widgets` with deletion enabled.
pub fn config() -> SweepConfig {
    SweepConfig::new("octo/widgets", "t0ken").with_dry_run(false)
}

/// Builds a closed pull request record.
pub fn pull_request(head: &str, updated_days_ago: i64, head_exists: bool) -> PullRequestRecord {
    PullRequestRecord {
        title: format!("Merge {head}"),
        url: format!("https://github.com/octo/widgets/pull/{}", head.len()),
        updated_at: days_ago(updated_days_ago),
        head_ref_name: head.to_string(),
        head_ref: head_exists.then(|| head.to_string()),
    }
}

/// Builds a page of closed pull requests.
pub fn pr_page(records: Vec<PullRequestRecord>, cursor: Option<&str>) -> PullRequestPage {
    PullRequestPage {
        records,
        end_cursor: cursor.map(str::to_string),
        has_next_page: cursor.is_some(),
    }
}

/// In-memory forge.
pub struct FakeForge {
    default_branch: String,
    page_size: usize,
    listed: Vec<BranchCandidate>,
    known: HashMap<String, BranchCandidate>,
    commit_dates: HashMap<String, DateTime<Utc>>,
    open_pr_shas: HashSet<String>,
    base_branches: HashSet<String>,
    failing_deletes: HashSet<String>,
    erroring_deletes: HashSet<String>,
    pr_pages: RefCell<VecDeque<Option<PullRequestPage>>>,
    /// Every call received, as `method` or `method:argument`.
    pub calls: RefCell<Vec<String>>,
    /// Branches deleted, in order.
    pub deleted: RefCell<Vec<String>>,
    /// Cursors passed to the pull request listing, in order.
    pub cursors: RefCell<Vec<Option<String>>>,
}

impl FakeForge {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            page_size: 30,
            listed: Vec::new(),
            known: HashMap::new(),
            commit_dates: HashMap::new(),
            open_pr_shas: HashSet::new(),
            base_branches: HashSet::new(),
            failing_deletes: HashSet::new(),
            erroring_deletes: HashSet::new(),
            pr_pages: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            cursors: RefCell::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn candidate(name: &str, protected: bool) -> BranchCandidate {
        let sha = format!("sha-{}", name.replace('/', "-"));
        BranchCandidate {
            name: name.to_string(),
            commit_url: format!("https://api.github.com/repos/octo/widgets/commits/{sha}"),
            commit_sha: sha,
            protected,
        }
    }

    fn insert(mut self, name: &str, protected: bool, age_days: Option<i64>, listed: bool) -> Self {
        let branch = Self::candidate(name, protected);
        if let Some(age) = age_days {
            self.commit_dates
                .insert(branch.commit_url.clone(), days_ago(age));
        }
        if listed {
            self.listed.push(branch.clone());
        }
        self.known.insert(name.to_string(), branch);
        self
    }

    /// Adds an unprotected branch whose last commit is `age_days` old.
    pub fn with_branch(self, name: &str, age_days: i64) -> Self {
        self.insert(name, false, Some(age_days), true)
    }

    /// Adds a listed branch flagged protected.
    pub fn with_protected_branch(self, name: &str, age_days: i64) -> Self {
        self.insert(name, true, Some(age_days), true)
    }

    /// Adds a branch that is not returned by the listing but can be looked up.
    pub fn with_unlisted_branch(self, name: &str, protected: bool, age_days: i64) -> Self {
        self.insert(name, protected, Some(age_days), false)
    }

    /// Adds an unprotected branch whose commit has no date.
    pub fn with_undated_branch(self, name: &str) -> Self {
        self.insert(name, false, None, true)
    }

    /// Marks the branch's head commit as referenced by an open pull request.
    pub fn with_open_pull_request(mut self, name: &str) -> Self {
        self.open_pr_shas
            .insert(Self::candidate(name, false).commit_sha);
        self
    }

    /// Marks the branch as the base of a pull request.
    pub fn with_base_branch(mut self, name: &str) -> Self {
        self.base_branches.insert(name.to_string());
        self
    }

    /// Makes the forge refuse to delete the branch.
    pub fn with_failing_delete(mut self, name: &str) -> Self {
        self.failing_deletes.insert(name.to_string());
        self
    }

    /// Makes the delete request for the branch fail to send.
    pub fn with_erroring_delete(mut self, name: &str) -> Self {
        self.erroring_deletes.insert(name.to_string());
        self
    }

    /// Queues a pull request page; `None` means every retry failed.
    pub fn with_pr_page(self, page: Option<PullRequestPage>) -> Self {
        self.pr_pages.borrow_mut().push_back(page);
        self
    }

    /// Number of calls whose method matches `method`.
    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.split(':').next() == Some(method))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().len()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ForgeApi for FakeForge {
    fn list_branches_page(&self, page: u32) -> Result<Vec<BranchCandidate>> {
        self.record(format!("list_branches_page:{page}"));
        let index = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX);
        Ok(self
            .listed
            .chunks(self.page_size)
            .nth(index)
            .map(<[BranchCandidate]>::to_vec)
            .unwrap_or_default())
    }

    fn default_branch(&self) -> Result<String> {
        self.record("default_branch".to_string());
        Ok(self.default_branch.clone())
    }

    fn branch(&self, name: &str) -> Result<Option<BranchCandidate>> {
        self.record(format!("branch:{name}"));
        Ok(self.known.get(name).cloned())
    }

    fn has_open_pull_request(&self, commit_sha: &str) -> Result<bool> {
        self.record(format!("has_open_pull_request:{commit_sha}"));
        Ok(self.open_pr_shas.contains(commit_sha))
    }

    fn is_pull_request_base(&self, branch: &str) -> Result<bool> {
        self.record(format!("is_pull_request_base:{branch}"));
        Ok(self.base_branches.contains(branch))
    }

    fn commit_date(&self, commit_url: &str) -> Result<Option<DateTime<Utc>>> {
        self.record(format!("commit_date:{commit_url}"));
        Ok(self.commit_dates.get(commit_url).copied())
    }

    fn closed_pull_requests(&self, after: Option<&str>) -> Option<PullRequestPage> {
        self.record("closed_pull_requests".to_string());
        self.cursors.borrow_mut().push(after.map(str::to_string));
        self.pr_pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Some(PullRequestPage::default()))
    }

    fn delete_branch(&self, name: &str) -> Result<bool> {
        self.record(format!("delete_branch:{name}"));
        if self.erroring_deletes.contains(name) {
            return Err(Error::OperationFailed {
                operation: "delete_branch".to_string(),
                cause: "connection reset".to_string(),
            });
        }
        if self.failing_deletes.contains(name) {
            return Ok(false);
        }
        self.deleted.borrow_mut().push(name.to_string());
        Ok(true)
    }
}
