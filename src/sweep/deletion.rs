//! Deletion executor.

use crate::forge::ForgeApi;
use tracing::{info, instrument, warn};

/// Outcome of deleting a batch of branches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Branches the forge confirmed deleted.
    pub deleted: Vec<String>,
    /// Branches that could not be deleted.
    pub failed: Vec<String>,
    /// Whether deletion was skipped because of a dry run.
    pub skipped: bool,
}

impl DeletionReport {
    /// Report for a dry run.
    #[must_use]
    pub const fn skipped() -> Self {
        Self {
            deleted: Vec::new(),
            failed: Vec::new(),
            skipped: true,
        }
    }

    /// Returns `true` if any delete failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Deletes each branch independently.
///
/// A failure is logged and recorded and the batch carries on. Nothing is
/// retried. In dry-run mode no forge call is made.
#[instrument(
    name = "branchsweep.delete",
    skip(forge, branches),
    fields(count = branches.len(), dry_run = dry_run)
)]
pub fn delete_branches<F: ForgeApi + ?Sized>(
    forge: &F,
    branches: &[String],
    dry_run: bool,
) -> DeletionReport {
    if dry_run {
        info!("This is a dry run, skipping deletion of branches");
        return DeletionReport::skipped();
    }

    let mut report = DeletionReport::default();
    for branch in branches {
        info!(branch = %branch, "Deleting branch");
        match forge.delete_branch(branch) {
            Ok(true) => {
                info!(branch = %branch, "Branch deleted");
                report.deleted.push(branch.clone());
            },
            Ok(false) => {
                warn!(branch = %branch, "Failed to delete branch");
                report.failed.push(branch.clone());
            },
            Err(e) => {
                warn!(branch = %branch, error = %e, "Failed to delete branch");
                report.failed.push(branch.clone());
            },
        }
    }
    report
}
