//! Branch sweeping.
//!
//! [`BranchSweeper`] runs one discovery strategy, then hands the selected
//! branches to the deletion executor unless the run is dry.

mod deletion;
mod discovery;
pub mod filter;

pub use deletion::{DeletionReport, delete_branches};
pub use discovery::collect_deletable;
pub use filter::{FilterPipeline, Rejection, Verdict};

use crate::Result;
use crate::config::SweepConfig;
use crate::forge::ForgeApi;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Safely converts Duration to milliseconds as u64, capping at `u64::MAX`.
#[inline]
fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result of a sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    /// Branches selected for deletion, in discovery order.
    pub branches: Vec<String>,
    /// Outcome of the deletion step.
    pub deletion: DeletionReport,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Duration of the sweep in milliseconds.
    pub duration_ms: u64,
}

impl SweepResult {
    /// Returns a human-readable summary of the sweep.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.branches.is_empty() {
            return format!("No branches to delete ({}ms)", self.duration_ms);
        }
        if self.dry_run {
            return format!(
                "Dry run: would delete {} branches ({}ms)",
                self.branches.len(),
                self.duration_ms
            );
        }
        format!(
            "Deleted {} of {} branches, {} failed ({}ms)",
            self.deletion.deleted.len(),
            self.branches.len(),
            self.deletion.failed.len(),
            self.duration_ms
        )
    }
}

/// Runs a sweep of one repository.
pub struct BranchSweeper<'a, F: ForgeApi + ?Sized> {
    forge: &'a F,
    config: &'a SweepConfig,
}

impl<'a, F: ForgeApi + ?Sized> BranchSweeper<'a, F> {
    /// Creates a sweeper.
    #[must_use]
    pub const fn new(forge: &'a F, config: &'a SweepConfig) -> Self {
        Self { forge, config }
    }

    /// Discovers stale branches and deletes them unless the run is dry.
    ///
    /// # Errors
    ///
    /// Returns any fatal discovery error. Delete failures are reported in
    /// [`SweepResult::deletion`] instead.
    pub fn run(&self) -> Result<SweepResult> {
        self.run_at(Utc::now())
    }

    /// Same as [`BranchSweeper::run`] with an explicit "now" for age checks.
    #[instrument(
        name = "branchsweep.run",
        skip(self, now),
        fields(
            repository = %self.config.repository,
            strategy = %self.config.strategy,
            dry_run = self.config.dry_run
        )
    )]
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<SweepResult> {
        let start = Instant::now();
        let config = self.config;

        let branches = config.strategy.discover(self.forge, config, now)?;
        info!(count = branches.len(), branches = ?branches, "Branches queued for deletion");

        let deletion = delete_branches(self.forge, &branches, config.dry_run);

        Ok(SweepResult {
            branches,
            deletion,
            dry_run: config.dry_run,
            duration_ms: duration_to_millis(start.elapsed()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_nothing_found() {
        let result = SweepResult {
            dry_run: true,
            duration_ms: 12,
            ..SweepResult::default()
        };
        assert_eq!(result.summary(), "No branches to delete (12ms)");
    }

    #[test]
    fn test_summary_dry_run() {
        let result = SweepResult {
            branches: vec!["feature/a".to_string(), "feature/b".to_string()],
            deletion: DeletionReport::skipped(),
            dry_run: true,
            duration_ms: 40,
        };
        assert!(result.summary().contains("would delete 2 branches"));
    }

    #[test]
    fn test_summary_with_failures() {
        let result = SweepResult {
            branches: vec!["a".to_string(), "b".to_string()],
            deletion: DeletionReport {
                deleted: vec!["a".to_string()],
                failed: vec!["b".to_string()],
                skipped: false,
            },
            dry_run: false,
            duration_ms: 90,
        };

        assert!(result.deletion.has_failures());
        assert_eq!(result.summary(), "Deleted 1 of 2 branches, 1 failed (90ms)");
    }
}
