//! Page sources over the two forge paging styles.
//!
//! REST branch listings are paged by page number; GraphQL pull request
//! listings are paged by an opaque forward-only cursor. Both are exposed as a
//! [`PageSource`] so discovery does not care which style it is reading.

use super::{BranchCandidate, ForgeApi, PullRequestRecord};
use crate::{Error, Result};
use tracing::debug;

/// A forward-only sequence of pages.
pub trait PageSource {
    /// Item type of each page.
    type Item;

    /// Fetches the next page, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the forge error that prevented the page from being read.
    fn next_page(&mut self) -> Result<Option<Vec<Self::Item>>>;
}

/// Page-number pagination over the branch listing.
///
/// Pages are 1-based; the listing ends at the first empty page.
pub struct BranchPages<'a, F: ForgeApi + ?Sized> {
    forge: &'a F,
    page: u32,
    exhausted: bool,
}

impl<'a, F: ForgeApi + ?Sized> BranchPages<'a, F> {
    /// First page number requested.
    pub const FIRST_PAGE: u32 = 1;

    /// Creates a source starting at the first page.
    #[must_use]
    pub const fn new(forge: &'a F) -> Self {
        Self {
            forge,
            page: Self::FIRST_PAGE,
            exhausted: false,
        }
    }
}

impl<F: ForgeApi + ?Sized> PageSource for BranchPages<'_, F> {
    type Item = BranchCandidate;

    fn next_page(&mut self) -> Result<Option<Vec<BranchCandidate>>> {
        if self.exhausted {
            return Ok(None);
        }
        let branches = self.forge.list_branches_page(self.page)?;
        debug!(page = self.page, count = branches.len(), "Fetched branch page");
        self.page += 1;
        if branches.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(branches))
    }
}

/// Cursor pagination over closed pull requests.
///
/// Fails with [`Error::GraphQlExhausted`] when the forge could not return a
/// page after all retries.
pub struct ClosedPullRequestPages<'a, F: ForgeApi + ?Sized> {
    forge: &'a F,
    cursor: Option<String>,
    has_next_page: bool,
}

impl<'a, F: ForgeApi + ?Sized> ClosedPullRequestPages<'a, F> {
    /// Creates a source starting before the first page.
    #[must_use]
    pub const fn new(forge: &'a F) -> Self {
        Self {
            forge,
            cursor: None,
            has_next_page: true,
        }
    }
}

impl<F: ForgeApi + ?Sized> PageSource for ClosedPullRequestPages<'_, F> {
    type Item = PullRequestRecord;

    fn next_page(&mut self) -> Result<Option<Vec<PullRequestRecord>>> {
        if !self.has_next_page {
            return Ok(None);
        }
        let page = self
            .forge
            .closed_pull_requests(self.cursor.as_deref())
            .ok_or_else(|| Error::GraphQlExhausted {
                attempts: self.forge.graphql_attempts(),
            })?;
        debug!(
            count = page.records.len(),
            has_next_page = page.has_next_page,
            end_cursor = ?page.end_cursor,
            "Fetched closed pull request page"
        );

        self.cursor = page.end_cursor;
        self.has_next_page = page.has_next_page && self.cursor.is_some();
        if page.records.is_empty() {
            self.has_next_page = false;
            return Ok(None);
        }
        Ok(Some(page.records))
    }
}
