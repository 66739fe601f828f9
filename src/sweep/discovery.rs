//! Discovery strategies.
//!
//! Both strategies feed a [`PageSource`] through the shared paging loop in
//! [`collect_deletable`], which returns as soon as the branch limit is hit.

use super::filter::{FilterPipeline, Rejection, Verdict};
use crate::config::{Strategy, SweepConfig};
use crate::forge::{
    BranchCandidate, BranchPages, ClosedPullRequestPages, ForgeApi, PageSource, PullRequestRecord,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

impl Strategy {
    /// Finds deletable branches, in discovery order, up to the configured limit.
    ///
    /// Makes no forge call when the limit is zero.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the forge. For
    /// [`Strategy::ClosedPullRequests`], returns [`Error::GraphQlExhausted`]
    /// only if a page could not be fetched before any branch was selected.
    #[instrument(
        name = "branchsweep.discover",
        skip(self, forge, config, now),
        fields(
            strategy = %self,
            repository = %config.repository,
            limit = config.branch_limit
        )
    )]
    pub fn discover<F: ForgeApi + ?Sized>(
        self,
        forge: &F,
        config: &SweepConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        if config.branch_limit < 1 {
            return Ok(Vec::new());
        }

        // The default branch is not always protected.
        let default_branch = forge.default_branch()?;
        let filters = FilterPipeline::new(&default_branch, config, now);

        match self {
            Self::AllBranches => collect_deletable(
                &mut BranchPages::new(forge),
                config.branch_limit,
                |branch| evaluate_branch(forge, &filters, branch),
            ),
            Self::ClosedPullRequests => collect_deletable(
                &mut ClosedPullRequestPages::new(forge),
                config.branch_limit,
                |pull_request| evaluate_pull_request(forge, &filters, pull_request),
            ),
        }
    }
}

/// Drains `source`, keeping the names `evaluate` selects, until `limit` is reached.
///
/// If the source gives up with [`Error::GraphQlExhausted`] after something has
/// been selected, the partial list is returned instead of the error.
pub fn collect_deletable<S, E>(source: &mut S, limit: usize, mut evaluate: E) -> Result<Vec<String>>
where
    S: PageSource,
    E: FnMut(&S::Item) -> Result<Option<String>>,
{
    let mut deletable = Vec::new();
    if limit < 1 {
        return Ok(deletable);
    }

    loop {
        let page = match source.next_page() {
            Ok(Some(page)) => page,
            Ok(None) => return Ok(deletable),
            Err(Error::GraphQlExhausted { attempts }) if !deletable.is_empty() => {
                warn!(
                    attempts,
                    selected = deletable.len(),
                    "Could not fetch more pull requests, returning branches found so far"
                );
                return Ok(deletable);
            },
            Err(err) => return Err(err),
        };

        for item in &page {
            if let Some(name) = evaluate(item)? {
                deletable.push(name);
                if deletable.len() >= limit {
                    info!(limit, "Reached branch limit");
                    return Ok(deletable);
                }
            }
        }
    }
}

/// Evaluates one listed branch.
fn evaluate_branch<F: ForgeApi + ?Sized>(
    forge: &F,
    filters: &FilterPipeline<'_>,
    branch: &BranchCandidate,
) -> Result<Option<String>> {
    info!(branch = %branch.name, "Analyzing branch");
    let verdict = filters.evaluate(forge, branch)?;
    Ok(accept(&branch.name, verdict))
}

/// Evaluates the head branch of one closed pull request.
///
/// The pull request's update time is checked before the branch is looked up,
/// and the commit age is checked again afterwards; both must pass.
fn evaluate_pull_request<F: ForgeApi + ?Sized>(
    forge: &F,
    filters: &FilterPipeline<'_>,
    pull_request: &PullRequestRecord,
) -> Result<Option<String>> {
    info!(url = %pull_request.url, title = %pull_request.title, "Analyzing pull request");
    let name = pull_request.head_ref_name.as_str();

    if !pull_request.head_branch_exists() {
        return Ok(accept(name, Err(Rejection::HeadBranchDeleted)));
    }
    let screened = filters
        .screen_name(name)
        .and_then(|()| filters.check_pull_request_age(pull_request.updated_at));
    if screened.is_err() {
        return Ok(accept(name, screened));
    }

    let Some(branch) = forge.branch(name)? else {
        return Ok(accept(name, Err(Rejection::BranchNotFound)));
    };
    if let Err(rejection) = FilterPipeline::check_protected(branch.protected) {
        return Ok(accept(name, Err(rejection)));
    }
    let verdict = filters.check_remote(forge, &branch)?;
    Ok(accept(&branch.name, verdict))
}

/// Logs a verdict and returns the branch name if it was accepted.
fn accept(name: &str, verdict: Verdict) -> Option<String> {
    match verdict {
        Ok(()) => {
            info!(branch = name, "Branch meets the criteria for deletion");
            Some(name.to_string())
        },
        Err(rejection) => {
            info!(
                branch = name,
                reason = rejection.label(),
                "Ignoring `{name}` because {rejection}"
            );
            None
        },
    }
}
